use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

pub fn save_json<T: Serialize>(data: &T, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(path)?;
    file.write_all(to_pretty_json(data)?.as_bytes())?;
    info!("{} written", path.display());
    Ok(())
}

pub fn to_pretty_json<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{AggregateReport, ReviewRecord};

    #[test]
    fn writes_report_as_pretty_json() {
        let report = AggregateReport::from_reviews(vec![ReviewRecord {
            reviewer: Some("Ana".to_string()),
            ..Default::default()
        }]);
        let path = std::env::temp_dir().join(format!("reviews-{}.json", std::process::id()));
        save_json(&report, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["reviews_count"], 1);
        assert_eq!(value["reviews"][0]["reviewer"], "Ana");
        assert!(written.contains('\n'));
    }
}
