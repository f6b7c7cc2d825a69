//! SUSHI `ReportRequest` document builder
//!
//! Produces the SOAP 1.1 envelope a SUSHI client posts to a provider endpoint.
//! Sending it is left to the caller.

use crate::types::{DecoderError, ReportType, Result};
use crate::xml::SUSHI_NS;
use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;

const SOAP_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
const PASSWORD_TEXT: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";

/// WS-Security username token, required by some providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WsCredentials {
    pub username: String,
    pub password: String,
}

/// Everything needed to ask one provider for one report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRequest {
    pub requestor_id: String,
    pub requestor_name: String,
    pub requestor_email: String,
    pub customer_id: String,
    pub customer_name: String,
    pub report_type: ReportType,
    pub release: String,
    /// First day of the usage range
    pub start: NaiveDate,
    /// Last day of the usage range
    pub end: NaiveDate,
    pub created: NaiveDateTime,
    pub credentials: Option<WsCredentials>,
}

impl ReportRequest {
    /// Request identifier written to `ReportRequest/@ID`
    pub fn id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.customer_id,
            self.report_type,
            self.created.format("%Y%m%d%H%M%S")
        )
    }
}

/// Build the SOAP envelope for a report request
pub fn build_request(request: &ReportRequest) -> Result<String> {
    let mut w = EnvelopeWriter::new();

    w.event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    w.open(
        "soap:Envelope",
        &[("xmlns:soap", SOAP_NS), ("xmlns:s", SUSHI_NS)],
    )?;

    if let Some(credentials) = &request.credentials {
        w.open("soap:Header", &[])?;
        w.open("wsse:Security", &[("xmlns:wsse", WSSE_NS)])?;
        w.open("wsse:UsernameToken", &[])?;
        w.text_element("wsse:Username", &[], &credentials.username)?;
        w.text_element("wsse:Password", &[("Type", PASSWORD_TEXT)], &credentials.password)?;
        w.close("wsse:UsernameToken")?;
        w.close("wsse:Security")?;
        w.close("soap:Header")?;
    }

    let created = request.created.format("%Y-%m-%dT%H:%M:%S").to_string();
    let id = request.id();

    w.open("soap:Body", &[])?;
    w.open("s:ReportRequest", &[("Created", created.as_str()), ("ID", id.as_str())])?;

    w.open("s:Requestor", &[])?;
    w.text_element("s:ID", &[], &request.requestor_id)?;
    w.text_element("s:Name", &[], &request.requestor_name)?;
    w.text_element("s:Email", &[], &request.requestor_email)?;
    w.close("s:Requestor")?;

    w.open("s:CustomerReference", &[])?;
    w.text_element("s:ID", &[], &request.customer_id)?;
    w.text_element("s:Name", &[], &request.customer_name)?;
    w.close("s:CustomerReference")?;

    w.open(
        "s:ReportDefinition",
        &[("Name", request.report_type.code()), ("Release", request.release.as_str())],
    )?;
    w.open("s:Filters", &[])?;
    w.open("s:UsageDateRange", &[])?;
    let (begin, end) = (
        request.start.format("%Y-%m-%d").to_string(),
        request.end.format("%Y-%m-%d").to_string(),
    );
    w.text_element("s:Begin", &[], &begin)?;
    w.text_element("s:End", &[], &end)?;
    w.close("s:UsageDateRange")?;
    w.close("s:Filters")?;
    w.close("s:ReportDefinition")?;

    w.close("s:ReportRequest")?;
    w.close("soap:Body")?;
    w.close("soap:Envelope")?;

    log::debug!("Built {} request {}", request.report_type, id);
    w.finish()
}

fn build_error(e: impl std::fmt::Display) -> DecoderError {
    DecoderError::RequestBuild(e.to_string())
}

struct EnvelopeWriter {
    writer: Writer<Vec<u8>>,
}

impl EnvelopeWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(build_error)
    }

    fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut start = BytesStart::new(name);
        for &attribute in attributes {
            start.push_attribute(attribute);
        }
        self.event(Event::Start(start))
    }

    fn close(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<()> {
        self.open(name, attributes)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner()).map_err(build_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlDocument;

    fn request() -> ReportRequest {
        ReportRequest {
            requestor_id: "req-1".to_string(),
            requestor_name: "Library Systems".to_string(),
            requestor_email: "stats@example.edu".to_string(),
            customer_id: "CUST42".to_string(),
            customer_name: "Smith & Jones College".to_string(),
            report_type: ReportType::JR1,
            release: "4".to_string(),
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
            created: NaiveDate::from_ymd_opt(2023, 4, 2)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap(),
            credentials: None,
        }
    }

    #[test]
    fn test_request_document_contents() {
        let xml = build_request(&request()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("Smith &amp; Jones College"));

        let doc = XmlDocument::parse(&xml).unwrap();
        let report_request = doc.first(SUSHI_NS, "ReportRequest").unwrap();
        assert_eq!(report_request.attribute("Created"), Some("2023-04-02T08:30:00"));
        assert_eq!(report_request.attribute("ID"), Some("CUST42-JR1-20230402083000"));
        assert_eq!(
            report_request.text_at(SUSHI_NS, &["Requestor", "Email"]).as_deref(),
            Some("stats@example.edu")
        );
        assert_eq!(
            report_request.text_at(SUSHI_NS, &["CustomerReference", "Name"]).as_deref(),
            Some("Smith & Jones College")
        );

        let definition = report_request.child(SUSHI_NS, "ReportDefinition").unwrap();
        assert_eq!(definition.attribute("Name"), Some("JR1"));
        assert_eq!(definition.attribute("Release"), Some("4"));
        assert_eq!(
            definition.text_at(SUSHI_NS, &["Filters", "UsageDateRange", "Begin"]).as_deref(),
            Some("2023-01-01")
        );
        assert_eq!(
            definition.text_at(SUSHI_NS, &["Filters", "UsageDateRange", "End"]).as_deref(),
            Some("2023-03-31")
        );
        assert!(doc.first(WSSE_NS, "Security").is_none());
    }

    #[test]
    fn test_request_with_credentials() {
        let mut request = request();
        request.credentials = Some(WsCredentials {
            username: "api-user".to_string(),
            password: "s3cret".to_string(),
        });

        let doc = XmlDocument::parse(&build_request(&request).unwrap()).unwrap();
        let token = doc.first(WSSE_NS, "UsernameToken").unwrap();
        assert_eq!(token.text_at(WSSE_NS, &["Username"]).as_deref(), Some("api-user"));
        let password = token.child(WSSE_NS, "Password").unwrap();
        assert_eq!(password.text(), "s3cret");
        assert_eq!(password.attribute("Type"), Some(PASSWORD_TEXT));

        let header = doc.first(SOAP_NS, "Header").unwrap();
        assert!(header.child(WSSE_NS, "Security").is_some());
    }
}
