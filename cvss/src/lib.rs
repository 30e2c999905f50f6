pub mod cvss3;

pub use cvss3::{Cvss3Base, Error, report::CvssReport};

/// Parse a CVSS v3.x vector string and compute its full base-score report.
///
/// This is the one-stop entry point for callers that only want the numbers:
/// the vector is validated (all 8 base metrics, version 3.0/3.1 only) and the
/// returned report carries score, severity and sub-scores alongside the
/// original vector string.
pub fn evaluate(vector: &str) -> Result<CvssReport, Error> {
    let base: Cvss3Base = vector.parse()?;
    Ok(base.report(vector))
}
