use schemars::schema_for;
use scop::input::CalculationRequest;

fn main() -> anyhow::Result<()> {
    let schema = schema_for!(CalculationRequest);
    println!("{}", serde_json::to_string_pretty(&schema)?);

    Ok(())
}
