//! Integration specifications for roster filtering and export through the public API.
//!
//! Records are decoded from the JSON shape the record store returns so the scenarios cover the
//! boundary as well as the pure filter and export functions.

use casting_call::casting::{
    filter_owned, filter_records, render_export, to_delimited_string, CsvQuoting, ExportFormat,
    ExportSettings, FilterQuery, FilterSpec, Gender, TabularDocument, UserRecord,
};
use serde_json::json;

fn users() -> Vec<UserRecord> {
    serde_json::from_value(json!([
        {
            "id": "u-ann",
            "name": "Ann",
            "email": "a@x.com",
            "mobile": "111",
            "age": "30",
            "gender": "Female",
            "location": "Pune",
            "role": "talent"
        },
        {
            "id": "u-bob",
            "name": "Bob",
            "email": "b@x.com",
            "mobile": "222",
            "age": "40",
            "gender": "Male",
            "location": "Mumbai"
        },
        {
            "id": "u-dev",
            "name": "Dev",
            "email": "dev@y.org",
            "age": "n/a",
            "gender": "Other",
            "location": "Navi Mumbai"
        }
    ]))
    .expect("user dump parses")
}

#[test]
fn empty_filter_returns_every_record_in_order() {
    let all = users();
    assert_eq!(filter_owned(&all, &FilterSpec::new()), all);
}

#[test]
fn ann_and_bob_examples_hold() {
    let all: Vec<UserRecord> = users().into_iter().take(2).collect();

    let male = filter_records(&all, &FilterSpec::new().with_gender(Gender::Male));
    assert_eq!(male.len(), 1);
    assert_eq!(male[0].name, "Bob");

    let older = filter_records(&all, &FilterSpec::new().with_age_range(Some(35), None));
    assert_eq!(older.iter().map(|u| &u.name[..]).collect::<Vec<_>>(), ["Bob"]);

    let younger = filter_records(&all, &FilterSpec::new().with_age_range(None, Some(35)));
    assert_eq!(younger.iter().map(|u| &u.name[..]).collect::<Vec<_>>(), ["Ann"]);
}

#[test]
fn exact_age_from_query_overrides_range_bounds() {
    let all = users();
    let spec = FilterSpec::try_from(FilterQuery {
        age_from: Some("35".to_string()),
        age_exact: Some("30".to_string()),
        ..FilterQuery::default()
    })
    .expect("valid query");

    let matched = filter_owned(&all, &spec);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name, "Ann");
}

#[test]
fn non_numeric_age_is_excluded_only_by_age_filters() {
    let all = users();

    let mumbai = filter_owned(&all, &FilterSpec::new().with_location("MUMBAI"));
    assert_eq!(
        mumbai.iter().map(|u| u.name.as_str()).collect::<Vec<_>>(),
        ["Bob", "Dev"]
    );

    let mumbai_adults = filter_owned(
        &all,
        &FilterSpec::new()
            .with_location("mumbai")
            .with_age_range(Some(18), None),
    );
    assert_eq!(mumbai_adults.len(), 1);
}

#[test]
fn filtering_twice_gives_identical_output() {
    let all = users();
    let spec = FilterSpec::new().with_search("x.com");
    assert_eq!(filter_owned(&all, &spec), filter_owned(&all, &spec));
}

#[test]
fn delimited_export_has_header_then_rows_in_input_order() {
    let all = users();
    let csv = to_delimited_string(&all, CsvQuoting::Rfc4180).expect("export");

    assert_eq!(
        csv,
        "Name,Email,Phone,Age,Gender,Location\n\
         Ann,a@x.com,111,30,Female,Pune\n\
         Bob,b@x.com,222,40,Male,Mumbai\n\
         Dev,dev@y.org,N/A,n/a,Other,Navi Mumbai\n"
    );
}

#[test]
fn tabular_and_delimited_exports_share_contents() {
    let all = users();
    let document = TabularDocument::from_records("Users", &all);
    let csv = to_delimited_string(&all, CsvQuoting::Verbatim).expect("export");

    let from_csv: Vec<Vec<String>> = csv
        .lines()
        .skip(1)
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect();
    assert_eq!(document.rows, from_csv);
}

#[test]
fn export_artifact_writes_to_any_sink() {
    let all = users();
    let artifact = render_export(
        "users",
        "Users",
        &all,
        ExportFormat::Csv,
        ExportSettings {
            quoting: CsvQuoting::Verbatim,
            page_rows: 10,
        },
    )
    .expect("artifact");

    let mut sink = Vec::new();
    std::io::Write::write_all(&mut sink, &artifact.body).expect("write");
    assert!(String::from_utf8(sink)
        .expect("utf8")
        .ends_with("Dev,dev@y.org,N/A,n/a,Other,Navi Mumbai"));
}
