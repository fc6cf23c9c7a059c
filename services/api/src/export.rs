use crate::infra::load_dump;
use casting_call::casting::{
    filter_records, render_export, CsvQuoting, ExportFormat, FilterSpec, Gender, UserRecord,
};
use casting_call::config::AppConfig;
use casting_call::error::AppError;
use casting_call::telemetry::{self, LogSink};
use clap::{Args, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum FormatArg {
    #[default]
    Csv,
    Table,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Table => ExportFormat::Table,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// JSON file holding a user array or a full record dump
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
    pub(crate) format: FormatArg,
    /// Write to this file instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Case-insensitive match against name or email
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Minimum age, inclusive
    #[arg(long, conflicts_with = "age_exact")]
    pub(crate) age_from: Option<u32>,
    /// Maximum age, inclusive
    #[arg(long, conflicts_with = "age_exact")]
    pub(crate) age_to: Option<u32>,
    /// Exact age
    #[arg(long)]
    pub(crate) age_exact: Option<u32>,
    /// Male, Female or Other
    #[arg(long, value_parser = parse_gender)]
    pub(crate) gender: Option<Gender>,
    /// Case-insensitive location substring
    #[arg(long)]
    pub(crate) location: Option<String>,
    /// Join CSV cells with bare commas instead of quoting them
    #[arg(long)]
    pub(crate) verbatim: bool,
}

impl ExportArgs {
    fn filter_spec(&self) -> FilterSpec {
        let mut spec = FilterSpec::new();
        if let Some(search) = &self.search {
            spec = spec.with_search(search.clone());
        }
        if let Some(location) = &self.location {
            spec = spec.with_location(location.clone());
        }
        if let Some(gender) = self.gender {
            spec = spec.with_gender(gender);
        }
        match self.age_exact {
            Some(age) => spec.set_age_exact(age),
            None => spec.set_age_range(self.age_from, self.age_to),
        }
        spec
    }
}

fn parse_gender(raw: &str) -> Result<Gender, String> {
    Gender::from_label(raw).ok_or_else(|| format!("'{raw}' is not one of Male, Female, Other"))
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogSink::Stderr)?;

    let dump = load_dump(&args.input)?;
    let spec = args.filter_spec();
    let mut settings = config.export;
    if args.verbatim {
        settings.quoting = CsvQuoting::Verbatim;
    }

    let body = export_users(&dump.users, &spec, args.format.into(), settings)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &body)?;
            info!(path = %path.display(), bytes = body.len(), "roster export written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&body)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Drop admins, filter and render. Returns the document bytes.
pub(crate) fn export_users(
    users: &[UserRecord],
    spec: &FilterSpec,
    format: ExportFormat,
    settings: casting_call::casting::ExportSettings,
) -> Result<Vec<u8>, AppError> {
    let talent: Vec<UserRecord> = users.iter().filter(|u| !u.is_admin()).cloned().collect();
    let matched = filter_records(&talent, spec);
    info!(shown = matched.len(), total = talent.len(), "roster filtered");

    let artifact = render_export("users", "Users", matched, format, settings)?;
    Ok(artifact.body)
}
