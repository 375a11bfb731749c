//! # Fluid Waste Codes
//!
//! Waste-list codes accepted on fluid-waste documents (refrigerants,
//! extinguishing agents, and the fluids recovered from them).

/// Waste codes a fluid-waste document may carry.
pub const FLUID_WASTE_CODES: &[&str] = &[
    "14 06 01*",
    "14 06 02*",
    "14 06 03*",
    "16 05 04*",
    "13 03 10*",
];

/// Whether `code` belongs to the fluid waste-code list.
pub fn is_fluid_waste_code(code: &str) -> bool {
    FLUID_WASTE_CODES.contains(&code.trim())
}
