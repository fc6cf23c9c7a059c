use std::io::Write;

use serde::{Deserialize, Serialize};

use super::domain::{ApplicantRecord, UserRecord};

/// Rendered in place of any optional value a record does not carry.
pub const PLACEHOLDER: &str = "N/A";

/// Fixed column ordering shared by every roster export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportColumn {
    Name,
    Email,
    Phone,
    Age,
    Gender,
    Location,
}

impl ExportColumn {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Name,
            Self::Email,
            Self::Phone,
            Self::Age,
            Self::Gender,
            Self::Location,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Age => "Age",
            Self::Gender => "Gender",
            Self::Location => "Location",
        }
    }
}

/// Records that can be written as a roster row.
pub trait Exportable {
    /// Cell value for `column`, or `None` to render the placeholder.
    fn cell(&self, column: ExportColumn) -> Option<&str>;

    fn export_row(&self) -> Vec<String> {
        ExportColumn::ordered()
            .into_iter()
            .map(|column| self.cell(column).unwrap_or(PLACEHOLDER).to_string())
            .collect()
    }
}

impl Exportable for UserRecord {
    fn cell(&self, column: ExportColumn) -> Option<&str> {
        match column {
            ExportColumn::Name => Some(self.name.as_str()),
            ExportColumn::Email => Some(self.email.as_str()),
            ExportColumn::Phone => self.mobile.as_deref(),
            ExportColumn::Age => self.age.as_deref(),
            ExportColumn::Gender => self.gender.map(|gender| gender.label()),
            ExportColumn::Location => self.location.as_deref(),
        }
    }
}

impl Exportable for ApplicantRecord {
    fn cell(&self, column: ExportColumn) -> Option<&str> {
        match column {
            ExportColumn::Name => Some(self.name.as_str()),
            ExportColumn::Email => Some(self.email.as_str()),
            ExportColumn::Phone => self.phone.as_deref(),
            ExportColumn::Age => self.age.as_deref(),
            ExportColumn::Gender => None,
            ExportColumn::Location => self.address.as_deref(),
        }
    }
}

pub fn header_row() -> Vec<String> {
    ExportColumn::ordered()
        .into_iter()
        .map(|column| column.label().to_string())
        .collect()
}

/// How delimited-text cells containing commas, quotes or newlines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsvQuoting {
    /// Quote cells as needed so every row keeps six columns.
    #[default]
    Rfc4180,
    /// Join cells with bare commas. A comma inside a value shifts the following columns.
    Verbatim,
}

impl CsvQuoting {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rfc4180" | "quoted" | "" => Some(Self::Rfc4180),
            "verbatim" | "raw" => Some(Self::Verbatim),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write delimited export: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Write the header and one row per record to `sink`, in input order.
pub fn write_delimited<'a, W, T, I>(
    sink: W,
    records: I,
    quoting: CsvQuoting,
) -> Result<(), ExportError>
where
    W: Write,
    T: Exportable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    match quoting {
        CsvQuoting::Rfc4180 => {
            let mut writer = csv::WriterBuilder::new()
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(sink);
            writer.write_record(header_row())?;
            for record in records {
                writer.write_record(record.export_row())?;
            }
            writer.flush()?;
        }
        CsvQuoting::Verbatim => {
            let mut sink = sink;
            let lines = std::iter::once(header_row())
                .chain(records.into_iter().map(|record| record.export_row()))
                .map(|row| row.join(","))
                .collect::<Vec<_>>();
            sink.write_all(lines.join("\n").as_bytes())?;
            sink.flush()?;
        }
    }
    Ok(())
}

pub fn to_delimited_string<'a, T, I>(records: I, quoting: CsvQuoting) -> Result<String, ExportError>
where
    T: Exportable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut buffer = Vec::new();
    write_delimited(&mut buffer, records, quoting)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Print-ready table with the same header and cells as the delimited export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabularDocument {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TabularDocument {
    pub fn from_records<'a, T, I>(title: impl Into<String>, records: I) -> Self
    where
        T: Exportable + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        Self {
            title: title.into(),
            header: header_row(),
            rows: records
                .into_iter()
                .map(|record| record.export_row())
                .collect(),
        }
    }

    pub fn page_count(&self, rows_per_page: usize) -> usize {
        let rows_per_page = rows_per_page.max(1);
        self.rows.len().div_ceil(rows_per_page).max(1)
    }

    /// Render as fixed-width text. Pages are separated by a form feed and repeat the header.
    pub fn render_text(&self, rows_per_page: usize) -> String {
        let widths = self.column_widths();
        let rows_per_page = rows_per_page.max(1);
        let total_pages = self.page_count(rows_per_page);

        let mut pages = Vec::with_capacity(total_pages);
        let mut chunks: Vec<&[Vec<String>]> = self.rows.chunks(rows_per_page).collect();
        if chunks.is_empty() {
            chunks.push(&[]);
        }

        for (index, chunk) in chunks.into_iter().enumerate() {
            let mut page = String::new();
            page.push_str(&format!(
                "{} (page {}/{})\n",
                self.title,
                index + 1,
                total_pages
            ));
            page.push_str(&format_line(&self.header, &widths));
            page.push_str(&separator(&widths));
            if chunk.is_empty() {
                page.push_str("(no records)\n");
            }
            for row in chunk {
                page.push_str(&format_line(row, &widths));
            }
            pages.push(page);
        }

        pages.join("\u{c}")
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.header.iter().map(|cell| cell.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        widths
    }
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let padded = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>();
    format!("{}\n", padded.join(" | ").trim_end())
}

fn separator(widths: &[usize]) -> String {
    let dashes = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>();
    format!("{}\n", dashes.join("-+-"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Csv,
    Table,
}

/// Knobs shared by every export produced by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSettings {
    pub quoting: CsvQuoting,
    pub page_rows: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            quoting: CsvQuoting::Rfc4180,
            page_rows: 40,
        }
    }
}

/// A rendered export plus the name and MIME type the download should carry.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content_type: mime::Mime,
    pub body: Vec<u8>,
}

impl ExportArtifact {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name)
    }
}

/// Render `records` in `format`, naming the download `<stem>.csv` or `<stem>.txt`.
pub fn render_export<'a, T, I>(
    stem: &str,
    title: &str,
    records: I,
    format: ExportFormat,
    settings: ExportSettings,
) -> Result<ExportArtifact, ExportError>
where
    T: Exportable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    match format {
        ExportFormat::Csv => {
            let mut body = Vec::new();
            write_delimited(&mut body, records, settings.quoting)?;
            Ok(ExportArtifact {
                file_name: format!("{stem}.csv"),
                content_type: mime::TEXT_CSV_UTF_8,
                body,
            })
        }
        ExportFormat::Table => {
            let document = TabularDocument::from_records(title, records);
            Ok(ExportArtifact {
                file_name: format!("{stem}.txt"),
                content_type: mime::TEXT_PLAIN_UTF_8,
                body: document.render_text(settings.page_rows).into_bytes(),
            })
        }
    }
}
