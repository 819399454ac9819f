//! CSV export for the KPI report and the controlled price series.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

use crate::sim::kpi::KpiReport;
use crate::sim::types::PriceSample;

/// Column headers of the price time-series CSV.
const PRICE_HEADER: [&str; 3] = ["time_s", "decision_price_$per_kWh", "charge_price_$per_kWh"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    File {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// `value` rounded to `digits` decimals in shortest form, keeping at least
/// one decimal (`0.25`, `90.0`).
fn rounded(value: f64, digits: usize) -> String {
    let fixed = format!("{value:.digits$}");
    if !fixed.contains('.') {
        return format!("{fixed}.0");
    }
    let trimmed = fixed.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}

fn create(path: &Path) -> Result<io::BufWriter<File>, ExportError> {
    let file = File::create(path).map_err(|source| ExportError::File {
        path: path.display().to_string(),
        source,
    })?;
    Ok(io::BufWriter::new(file))
}

/// Exports the KPI report to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `ExportError` if file creation or writing fails.
pub fn export_kpi_csv(kpi: &KpiReport, path: &Path) -> Result<(), ExportError> {
    write_kpi_csv(kpi, create(path)?)
}

/// Writes the KPI report as three CSV sections separated by blank lines:
/// strategy and its parameters, one row per station, then the totals.
///
/// # Errors
///
/// Returns an `ExportError` if writing fails.
pub fn write_kpi_csv(kpi: &KpiReport, mut writer: impl Write) -> Result<(), ExportError> {
    {
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(&mut writer);
        wtr.write_record(["strategy", kpi.strategy.as_str()])?;
        for (name, value) in &kpi.parameters {
            wtr.write_record([name.as_str(), value.as_str()])?;
        }
        wtr.flush()?;
    }
    writer.write_all(b"\n")?;

    {
        let mut wtr = csv::WriterBuilder::new().from_writer(&mut writer);
        wtr.write_record(["station_id", "utilization_rate", "revenue_$"])?;
        for s in &kpi.stations {
            wtr.write_record(&[
                s.station_id.clone(),
                rounded(s.utilization_rate, 4),
                rounded(s.revenue, 2),
            ])?;
        }
        wtr.flush()?;
    }
    writer.write_all(b"\n")?;

    let mut wtr = csv::WriterBuilder::new().from_writer(&mut writer);
    wtr.write_record(&[
        "TOTAL_revenue_$".to_string(),
        rounded(kpi.total_revenue, 2),
    ])?;
    wtr.write_record(&[
        "PAR_peak_to_avg_power".to_string(),
        rounded(kpi.peak_to_average, 4),
    ])?;
    wtr.write_record(&["total_steps".to_string(), kpi.total_steps.to_string()])?;
    wtr.flush()?;
    Ok(())
}

/// Exports the per-step price samples to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `ExportError` if file creation or writing fails.
pub fn export_price_csv(prices: &[PriceSample], path: &Path) -> Result<(), ExportError> {
    write_price_csv(prices, create(path)?)
}

/// Writes one row per step: whole simulation seconds, decision price and
/// charge price.
///
/// # Errors
///
/// Returns an `ExportError` if writing fails.
pub fn write_price_csv(prices: &[PriceSample], writer: impl Write) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(PRICE_HEADER)?;
    for p in prices {
        wtr.write_record(&[
            (p.time_s.trunc() as i64).to_string(),
            rounded(p.decision_price, 4),
            rounded(p.charge_price, 4),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::kpi::StationKpi;

    fn report() -> KpiReport {
        KpiReport {
            strategy: "ppo_time".into(),
            parameters: vec![
                ("base_$/kWh".into(), "0.3".into()),
                ("spread_$/kWh".into(), "0.3".into()),
                ("period_s".into(), "120.0".into()),
                ("cooldown_s".into(), "90.0".into()),
            ],
            stations: vec![
                StationKpi {
                    station_id: "CS_0".into(),
                    utilization_rate: 0.25,
                    revenue: 1.23456,
                },
                StationKpi {
                    station_id: "CS_1".into(),
                    utilization_rate: 0.0,
                    revenue: 0.0,
                },
            ],
            total_revenue: 1.23456,
            peak_to_average: 4.0,
            total_steps: 8,
        }
    }

    fn sample(step: usize, time_s: f64) -> PriceSample {
        PriceSample {
            step,
            time_s,
            decision_price: 0.3,
            charge_price: 0.2987654,
        }
    }

    #[test]
    fn kpi_sections_are_separated_by_blank_lines() {
        let mut buf = Vec::new();
        write_kpi_csv(&report(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "strategy,ppo_time",
                "base_$/kWh,0.3",
                "spread_$/kWh,0.3",
                "period_s,120.0",
                "cooldown_s,90.0",
                "",
                "station_id,utilization_rate,revenue_$",
                "CS_0,0.25,1.23",
                "CS_1,0.0,0.0",
                "",
                "TOTAL_revenue_$,1.23",
                "PAR_peak_to_avg_power,4.0",
                "total_steps,8",
            ]
        );
    }

    #[test]
    fn price_rows_truncate_time_and_round_prices() {
        let prices = vec![sample(0, 1.0), sample(1, 2.9)];
        let mut buf = Vec::new();
        write_price_csv(&prices, &mut buf).unwrap();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), PRICE_HEADER.to_vec());
        let rows: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][0], "2");
        assert_eq!(&rows[1][1], "0.3");
        assert_eq!(&rows[1][2], "0.2988");
    }

    #[test]
    fn rounding_drops_trailing_zeros() {
        assert_eq!(rounded(0.25, 4), "0.25");
        assert_eq!(rounded(0.29876, 4), "0.2988");
        assert_eq!(rounded(90.0, 2), "90.0");
        assert_eq!(rounded(0.0, 4), "0.0");
        assert_eq!(rounded(12.0, 0), "12.0");
        assert_eq!(rounded(1.005, 2), "1.0");
    }

    #[test]
    fn export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let kpi_path = dir.path().join("kpi.csv");
        let price_path = dir.path().join("prices.csv");
        export_kpi_csv(&report(), &kpi_path).unwrap();
        export_price_csv(&[sample(0, 1.0)], &price_path).unwrap();
        let kpi = std::fs::read_to_string(kpi_path).unwrap();
        assert!(kpi.starts_with("strategy,ppo_time"));
        let prices = std::fs::read_to_string(price_path).unwrap();
        assert_eq!(prices.lines().count(), 2);
    }

    #[test]
    fn missing_directory_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("kpi.csv");
        let err = export_kpi_csv(&report(), &path).unwrap_err();
        assert!(err.to_string().contains("kpi.csv"));
    }
}
