use std::path::Path;

use packcore::{BatteryDesign, Catalogue, ComponentCatalogue, DesignOrigin, RawCellRecord, Requirements};
use plotters::prelude::*;
use search::{DesignEngine, SearchConfig};

fn load<T: serde::de::DeserializeOwned>(name: &str) -> Result<T, Box<dyn std::error::Error>> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join(name);
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

fn bounds(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let min = values.clone().fold(f64::INFINITY, f64::min);
    let max = values.fold(f64::NEG_INFINITY, f64::max);
    let pad = ((max - min) * 0.05).max(1.0);
    (min - pad, max + pad)
}

fn draw_scatter(filename: &str, designs: &[BatteryDesign]) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let (x_min, x_max) = bounds(designs.iter().map(|d| d.total_price));
    let (y_min, y_max) = bounds(designs.iter().map(|d| d.total_energy / 1000.0));

    let mut chart = ChartBuilder::on(&root)
        .caption("Feasible designs: energy vs price", ("Arial", 28))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart.configure_mesh().x_desc("Price").y_desc("Energy [kWh]").draw()?;

    let groups: [(&str, RGBColor, fn(&DesignOrigin) -> bool); 3] = [
        ("single", BLUE, |o| matches!(o, DesignOrigin::SingleChemistry)),
        ("multi", GREEN, |o| matches!(o, DesignOrigin::MultiChemistry { .. })),
        ("optimum", RED, |o| matches!(o, DesignOrigin::GlobalOptimum { .. })),
    ];

    for (label, color, member) in groups {
        chart
            .draw_series(
                designs
                    .iter()
                    .filter(|d| member(&d.origin))
                    .map(|d| Circle::new((d.total_price, d.total_energy / 1000.0), 4, color.filled())),
            )?
            .label(label)
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
    }

    chart.configure_series_labels().border_style(&BLACK).draw()?;

    root.present()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cells: Vec<RawCellRecord> = load("cells.json")?;
    let components: ComponentCatalogue = load("components.json")?;
    let requirements: Requirements = load("requirements.json")?;

    let catalogue = Catalogue::from_raw(cells, components)?;
    let outcome = DesignEngine::new(SearchConfig::default()).run(&catalogue, &requirements);
    if outcome.plot_results.is_empty() {
        println!("No feasible designs to plot");
        return Ok(());
    }

    draw_scatter("designs_energy_vs_price.png", &outcome.plot_results)?;
    println!(
        "Plotted {} of {} designs to designs_energy_vs_price.png",
        outcome.plot_results.len(),
        outcome.total
    );
    Ok(())
}
