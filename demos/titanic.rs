//! An example using the `titanic` dataset

use arbor::{InstancesBuilder, RegressionTreeTrainer};
use polars::prelude::*;
use reqwest::blocking::Client;
use std::error::Error;
use std::io::Cursor;

fn main() -> Result<(), Box<dyn Error>> {
    let data = Vec::from_iter(
        Client::new()
            .get("https://raw.githubusercontent.com/mwaskom/seaborn-data/master/titanic.csv")
            .send()?
            .text()?
            .bytes(),
    );

    let features = ["pclass", "age", "sibsp", "parch"];
    let df = CsvReader::new(Cursor::new(data))
        .has_header(true)
        .finish()?
        .select(["fare", "pclass", "age", "sibsp", "parch"])?;

    let columns: Vec<Vec<f64>> = features
        .iter()
        .map(|name| {
            Ok(Vec::from_iter(
                df.column(name)?
                    .cast(&DataType::Float64)?
                    .f64()?
                    .into_iter()
                    .map(|v| v.unwrap_or(f64::NAN)),
            ))
        })
        .collect::<Result<_, Box<dyn Error>>>()?;
    let fare = Vec::from_iter(
        df.column("fare")?
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN)),
    );

    // Rows with a missing value are skipped; the builder refuses NaN.
    let mut builder = InstancesBuilder::new();
    builder
        .set_feature_labels(&features)
        .set_target_label("fare");
    for (i, target) in fare.iter().enumerate() {
        let row = Vec::from_iter(columns.iter().map(|column| column[i]));
        if target.is_nan() || row.iter().any(|v| v.is_nan()) {
            continue;
        }
        builder.add_instance(*target, &row)?;
    }

    let tree = RegressionTreeTrainer::default()
        .set_min_rows_per_child(25)
        .set_training_set(builder.build())
        .train()?;

    println!("{}", tree);
    println!(
        "Predicted fare for a 30 year old in second class: {:.2}",
        tree.predict(&[2.0, 30.0, 0.0, 0.0])?
    );

    Ok(())
}
