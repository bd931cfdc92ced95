use schemars::schema_for;
use scop::input::CalculationRequest;

#[test]
fn test_generate_json_schema() {
    let schema = serde_json::to_value(schema_for!(CalculationRequest)).unwrap();

    let properties = schema["properties"].as_object().unwrap();
    assert!(properties.contains_key("climate"));
    assert!(properties.contains_key("test_points"));
    assert!(properties.contains_key("off_mode_powers"));
}
