/// Converts a 0-100 confidence score into a letter grade.
///
/// | Range       | Grade |
/// |-------------|-------|
/// | >= 95       | A+    |
/// | >= 90       | A     |
/// | >= 80       | B     |
/// | >= 65       | C     |
/// | >= 40       | D     |
/// | < 40        | F     |
pub fn grade(score: f64) -> String {
    match score {
        s if s >= 95.0 => "A+".into(),
        s if s >= 90.0 => "A".into(),
        s if s >= 80.0 => "B".into(),
        s if s >= 65.0 => "C".into(),
        s if s >= 40.0 => "D".into(),
        _ => "F".into(),
    }
}
