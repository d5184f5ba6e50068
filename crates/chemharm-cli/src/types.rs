use chemharm_model::ParsedUnit;
use chemharm_units::MassSource;

/// One parsed unit string, with its conversion factor when a target was given.
#[derive(Debug, Clone)]
pub struct UnitRow {
    pub unit: ParsedUnit,
    pub conversion: Option<Result<f64, String>>,
}

#[derive(Debug, Clone)]
pub struct MassRow {
    pub substance: String,
    pub resolved: Result<(f64, MassSource), String>,
}
