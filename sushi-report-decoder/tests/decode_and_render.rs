// End-to-end decoding and rendering of saved SUSHI responses
use chrono::NaiveDate;
use std::path::PathBuf;
use sushi_report_decoder::{
    decode, render, DecoderError, ItemIdentifiers, MetricCategory, RenderRequest, ReportType,
    XmlDocument,
};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {:?}: {}", path, e))
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_jr1_soap_response_to_csv() {
    init_logging();
    let doc = XmlDocument::parse(&fixture("jr1_soap_response.xml")).unwrap();
    let report = decode(&doc).unwrap();

    assert_eq!(report.report_type, ReportType::JR1);
    assert!(report.exceptions.is_empty());
    let counter_report = report.first_report().unwrap();
    assert_eq!(counter_report.vendor.contact_email, "usage@example.com");
    assert_eq!(counter_report.vendor.website_url, "https://example.com");

    let request = RenderRequest::new(date(2023, 1, 1), date(2023, 2, 1))
        .unwrap()
        .with_customer("MAIN")
        .with_run_date(date(2023, 3, 5));
    let csv = render(&report, report.report_type, &request).unwrap();

    let expected = "\
Journal Report 1 (R4),Number of Successful Full-Text Article Requests by Month and Journal
MAIN
Period covered by report
2023-01-01 to 2023-02-28
Date run:
2023-3-5
,Publisher,Platform,Journal DOI,Proprietary Identifier,Print ISSN,Online ISSN,Reporting Period Total,Reporting Period HTML,Reporting Period PDF,Jan-2023,Feb-2023
Journal of Tests,Example Publishing,Example Online,10.5555/jot,,1234-5678,8765-4321,13,6,7,10,3
Quarterly Review,\"Smith, Jones & Co\",Example Online,,EXP:QR,,,2,2,0,,2
";
    assert_eq!(csv, expected);
}

#[test]
fn test_decoded_identifiers() {
    let doc = XmlDocument::parse(&fixture("jr1_soap_response.xml")).unwrap();
    let report = decode(&doc).unwrap();
    let items = &report.reports[0].customers[0].items;

    assert_eq!(items.len(), 2);
    match &items[1].identifiers {
        ItemIdentifiers::Journal(ids) => {
            assert_eq!(ids.proprietary, "EXP:QR");
            assert_eq!(ids.print_issn, "");
        }
        other => panic!("unexpected identifiers: {:?}", other),
    }
}

#[test]
fn test_db1_response_to_csv() {
    init_logging();
    let doc = XmlDocument::parse(&fixture("db1_response.xml")).unwrap();
    let report = decode(&doc).unwrap();

    // Unknown "Reviews" category is kept as its own bucket
    let perf = &report.reports[0].customers[0].items[0].performance;
    assert_eq!(perf.len(), 3);
    assert_eq!(
        perf[2].metrics.iter().next().map(|m| m.category),
        Some(MetricCategory::Invalid)
    );

    let request = RenderRequest::new(date(2023, 1, 1), date(2023, 1, 1))
        .unwrap()
        .with_customer("BRANCH")
        .with_run_date(date(2023, 2, 1));
    let csv = render(&report, ReportType::DB1, &request).unwrap();
    let rows: Vec<&str> = csv.lines().skip(7).collect();

    assert_eq!(
        rows,
        vec![
            "\"Abstracts, Full Edition\",Index Services,IndexPlatform,Regular Searches,40,40",
            "\"Abstracts, Full Edition\",Index Services,IndexPlatform,Searches-federated and automated,7,7",
            "\"Abstracts, Full Edition\",Index Services,IndexPlatform,Result Clicks,12,12",
            "\"Abstracts, Full Edition\",Index Services,IndexPlatform,Record Views,30,30",
        ]
    );
}

#[test]
fn test_exception_response() {
    let doc = XmlDocument::parse(&fixture("exception_response.xml")).unwrap();
    match decode(&doc) {
        Err(DecoderError::RemoteException(exception)) => {
            assert_eq!(exception.number, "2000");
            assert_eq!(exception.severity, "Error");
            assert_eq!(
                exception.to_string(),
                "Number: 2000, Severity: Error, Message: Requestor Not Authorized to Access Service"
            );
        }
        other => panic!("expected remote exception, got {:?}", other),
    }
}

#[test]
fn test_model_serializes_to_json() {
    let doc = XmlDocument::parse(&fixture("db1_response.xml")).unwrap();
    let report = decode(&doc).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["report_type"], "DB1");
    assert_eq!(json["reports"][0]["customers"][0]["id"], "BRANCH");
    assert_eq!(json["reports"][0]["customers"][0]["items"][0]["identifiers"], "Generic");
    assert_eq!(
        json["reports"][0]["customers"][0]["items"][0]["performance"][0]["metrics"]["metrics"][0]
            ["instances"][0]["metric_type"],
        "search_reg"
    );
}
