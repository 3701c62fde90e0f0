use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::ReportRow;

/// One interval run's rows, ready for rendering.
#[derive(Debug, Clone)]
pub struct Publication<'a> {
    pub interval_days: i64,
    pub as_of: NaiveDate,
    pub anchor: NaiveDate,
    pub run_id: Uuid,
    pub rows: &'a [ReportRow],
}

/// Destination addressed by the ordinal of the interval in the requested list.
pub trait PublishSink {
    fn publish(&mut self, ordinal: usize, publication: &Publication<'_>) -> anyhow::Result<()>;
}

pub const SHEET_HEADER: [&str; 6] = [
    "Dealer Name",
    "Leads",
    "Leads (Previous Period)",
    "Calculated Diff",
    "Z Score",
    "PM",
];

/// Manager display name to picture URL.
#[derive(Debug, Clone, Default)]
pub struct ManagerImages {
    urls: HashMap<String, String>,
}

impl ManagerImages {
    pub fn new(urls: HashMap<String, String>) -> Self {
        Self { urls }
    }

    /// Spreadsheet image formula when a picture is known, the plain name otherwise.
    pub fn cell(&self, manager_name: &str) -> String {
        match self.urls.get(manager_name) {
            Some(url) => format!("=IMAGE(\"{url}\")"),
            None => manager_name.to_string(),
        }
    }
}

/// Formats a ratio as a percentage with two decimals and thousands separators.
pub fn format_percent(ratio: f64) -> String {
    let fixed = format!("{:.2}", (ratio * 100.0).abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if ratio < 0.0 && !fixed.trim_matches(|c| c == '0' || c == '.').is_empty() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{fraction}%")
}

fn optional_cell(value: Option<f64>, render: impl Fn(f64) -> String) -> String {
    value.map(render).unwrap_or_default()
}

fn sheet_row(row: &ReportRow, images: &ManagerImages) -> [String; 6] {
    [
        row.client_name.clone(),
        row.current.unique_goals.to_string(),
        row.previous.unique_goals.to_string(),
        optional_cell(row.ratio, format_percent),
        optional_cell(row.z_score, |z| z.to_string()),
        images.cell(&row.manager_name),
    ]
}

/// Directory of CSV sheets, `sheet-<ordinal>.csv`, each replaced on publish.
pub struct CsvWorkbook {
    dir: PathBuf,
    images: ManagerImages,
}

impl CsvWorkbook {
    pub fn new(dir: impl Into<PathBuf>, images: ManagerImages) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(Self { dir, images })
    }

    pub fn sheet_path(&self, ordinal: usize) -> PathBuf {
        self.dir.join(format!("sheet-{ordinal}.csv"))
    }
}

impl PublishSink for CsvWorkbook {
    fn publish(&mut self, ordinal: usize, publication: &Publication<'_>) -> anyhow::Result<()> {
        let path = self.sheet_path(ordinal);
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        writer.write_record([format!("Last Update: {}", publication.as_of)])?;
        writer.write_record(SHEET_HEADER)?;
        for row in publication.rows {
            writer.write_record(sheet_row(row, &self.images))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Markdown document with one section per interval, written by [`MarkdownReport::finish`].
pub struct MarkdownReport {
    out: PathBuf,
    images: ManagerImages,
    sections: Vec<(usize, String)>,
}

impl MarkdownReport {
    pub fn new(out: impl Into<PathBuf>, images: ManagerImages) -> Self {
        Self {
            out: out.into(),
            images,
            sections: Vec::new(),
        }
    }

    pub fn render(&self, as_of: NaiveDate) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "# Client Growth Trajectory");
        let _ = writeln!(output, "Last Update: {as_of}");

        let mut sections: Vec<_> = self.sections.iter().collect();
        sections.sort_by_key(|(ordinal, _)| *ordinal);
        for (_, section) in sections {
            let _ = writeln!(output);
            output.push_str(section);
        }
        output
    }

    pub fn finish(&self, as_of: NaiveDate) -> anyhow::Result<&Path> {
        std::fs::write(&self.out, self.render(as_of))
            .with_context(|| format!("failed to write {}", self.out.display()))?;
        Ok(&self.out)
    }
}

impl PublishSink for MarkdownReport {
    fn publish(&mut self, ordinal: usize, publication: &Publication<'_>) -> anyhow::Result<()> {
        let mut section = String::new();
        let _ = writeln!(section, "## {} Day Interval", publication.interval_days);
        let _ = writeln!(
            section,
            "Anchored on {} (run {})",
            publication.anchor, publication.run_id
        );
        let _ = writeln!(section);

        if publication.rows.is_empty() {
            let _ = writeln!(section, "No clients with enough history for this interval.");
        } else {
            let _ = writeln!(section, "| {} |", SHEET_HEADER.join(" | "));
            let _ = writeln!(section, "|{}", "---|".repeat(SHEET_HEADER.len()));
            for row in publication.rows {
                let _ = writeln!(section, "| {} |", sheet_row(row, &self.images).join(" | "));
            }
        }

        self.sections.retain(|(existing, _)| *existing != ordinal);
        self.sections.push((ordinal, section));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Counters;

    fn row(name: &str, manager: &str, ratio: Option<f64>, z: Option<f64>) -> ReportRow {
        ReportRow {
            client_id: name.to_lowercase(),
            client_name: name.to_string(),
            manager_name: manager.to_string(),
            current: Counters {
                unique_goals: 150,
                ..Counters::default()
            },
            previous: Counters {
                unique_goals: 100,
                ..Counters::default()
            },
            ratio,
            z_score: z,
        }
    }

    fn publication(rows: &[ReportRow]) -> Publication<'_> {
        Publication {
            interval_days: 30,
            as_of: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            anchor: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            run_id: Uuid::nil(),
            rows,
        }
    }

    fn images() -> ManagerImages {
        ManagerImages::new(HashMap::from([(
            "Dana Ortiz".to_string(),
            "https://img.example.com/dana.png".to_string(),
        )]))
    }

    #[test]
    fn percent_formatting() {
        assert_eq!(format_percent(0.5), "50.00%");
        assert_eq!(format_percent(-0.5), "-50.00%");
        assert_eq!(format_percent(12.3456), "1,234.56%");
        assert_eq!(format_percent(-10000.0), "-1,000,000.00%");
        assert_eq!(format_percent(0.0), "0.00%");
        assert_eq!(format_percent(-0.00001), "0.00%");
    }

    #[test]
    fn manager_with_picture_becomes_image_formula() {
        let images = images();
        assert_eq!(
            images.cell("Dana Ortiz"),
            "=IMAGE(\"https://img.example.com/dana.png\")"
        );
        assert_eq!(images.cell("Sam Reyes"), "Sam Reyes");
    }

    #[test]
    fn csv_sheet_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut workbook = CsvWorkbook::new(dir.path(), images()).unwrap();
        let rows = vec![
            row("Alpha Ford", "Dana Ortiz", Some(0.5), Some(0.7)),
            row("Charlie Kia", "Sam Reyes", None, None),
        ];

        workbook.publish(2, &publication(&rows)).unwrap();

        let written = std::fs::read_to_string(workbook.sheet_path(2)).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines[0], "Last Update: 2024-07-01");
        assert_eq!(
            lines[1],
            "Dealer Name,Leads,Leads (Previous Period),Calculated Diff,Z Score,PM"
        );
        assert_eq!(
            lines[2],
            "Alpha Ford,150,100,50.00%,0.7,\"=IMAGE(\"\"https://img.example.com/dana.png\"\")\""
        );
        assert_eq!(lines[3], "Charlie Kia,150,100,,,Sam Reyes");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn republishing_replaces_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let mut workbook = CsvWorkbook::new(dir.path(), ManagerImages::default()).unwrap();
        let rows = vec![row("Alpha Ford", "Dana Ortiz", Some(0.5), None)];

        workbook.publish(0, &publication(&rows)).unwrap();
        workbook.publish(0, &publication(&[])).unwrap();

        let written = std::fs::read_to_string(workbook.sheet_path(0)).unwrap();
        assert_eq!(written.lines().count(), 2);
    }

    #[test]
    fn markdown_sections_follow_ordinal() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = MarkdownReport::new(dir.path().join("report.md"), images());
        let rows = vec![row("Alpha Ford", "Sam Reyes", Some(0.5), Some(1.0))];

        let mut later = publication(&[]);
        later.interval_days = 60;
        report.publish(1, &later).unwrap();
        report.publish(0, &publication(&rows)).unwrap();

        let path = report
            .finish(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
            .unwrap()
            .to_path_buf();
        let text = std::fs::read_to_string(path).unwrap();

        let thirty = text.find("## 30 Day Interval").unwrap();
        let sixty = text.find("## 60 Day Interval").unwrap();
        assert!(thirty < sixty);
        assert!(text.contains("| Alpha Ford | 150 | 100 | 50.00% | 1 | Sam Reyes |"));
        assert!(text.contains("No clients with enough history for this interval."));
    }
}
