//! Main decoder API
//!
//! Walks a parsed SUSHI/COUNTER document once and builds the [`SushiReport`]
//! model. The item variant (journal, book, consortium or generic) is chosen
//! from the declared report type, never from the item itself, so every item in
//! one document has the same shape.
//!
//! Fatal problems (unknown report type, missing item names, unknown metric
//! types, unparsable counts) abort the whole document. Dates, categories and
//! identifier types are parsed best-effort and only logged when wrong.

use crate::types::{
    CounterMetric, CounterReport, CustomerReport, DecoderError, ItemIdentifiers, MetricCategory,
    MetricInstance, MetricType, PerformanceItem, ReportItem, ReportType, Result, SushiException,
    SushiReport, Vendor,
};
use crate::xml::{XmlDocument, XmlElement, COUNTER_NS, SUSHI_NS};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Decode a parsed document into a report model
///
/// # Arguments
/// * `doc` - Parsed SUSHI response (SOAP envelope or bare report)
///
/// # Returns
/// * `Result<SushiReport>` - The decoded model, or the first fatal error
///
/// # Example
/// ```no_run
/// use sushi_report_decoder::{decode, XmlDocument};
///
/// let text = std::fs::read_to_string("jr1_response.xml").unwrap();
/// let doc = XmlDocument::parse(&text).unwrap();
/// let report = decode(&doc).unwrap();
/// println!("{} with {} report(s)", report.report_type, report.reports.len());
/// ```
pub fn decode(doc: &XmlDocument) -> Result<SushiReport> {
    let exceptions = collect_exceptions(doc);
    for exception in &exceptions {
        log::warn!("SUSHI server returned exception: {}", exception);
    }

    let definition = match doc.first(SUSHI_NS, "ReportDefinition") {
        Some(definition) => definition,
        None => {
            return Err(match exceptions.into_iter().next() {
                Some(exception) => DecoderError::RemoteException(exception),
                None => DecoderError::MissingElement {
                    element: "ReportDefinition".to_string(),
                    context: "document".to_string(),
                },
            })
        }
    };

    let report_type: ReportType = required_attribute(definition, "Name")?.parse()?;
    let release = required_attribute(definition, "Release")?.to_string();

    log::info!("Decoding {} report (release {})", report_type, release);

    let decoder = ReportDecoder { report_type };
    let reports = doc
        .descendants(COUNTER_NS, "Report")
        .into_iter()
        .map(|report| decoder.parse_report(report))
        .collect::<Result<Vec<_>>>()?;

    let sushi_report = SushiReport {
        report_type,
        release,
        reports,
        exceptions,
    };

    let stats = sushi_report.stats();
    log::info!(
        "Decoding complete: {} report(s), {} customer(s), {} item(s), {} metric bucket(s)",
        stats.num_reports,
        stats.num_customers,
        stats.num_items,
        stats.num_metrics
    );

    Ok(sushi_report)
}

/// Parse and decode a document held in a string
pub fn decode_str(text: &str) -> Result<SushiReport> {
    let doc = XmlDocument::parse(text)?;
    decode(&doc)
}

/// Size statistics for a decoded report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportStats {
    pub num_reports: usize,
    pub num_customers: usize,
    pub num_items: usize,
    pub num_metrics: usize,
}

impl SushiReport {
    /// Count reports, customers, items and metric buckets
    pub fn stats(&self) -> ReportStats {
        let customers = self.reports.iter().flat_map(|r| r.customers.iter());
        let items: Vec<&ReportItem> = customers.clone().flat_map(|c| c.items.iter()).collect();
        let num_metrics = items
            .iter()
            .flat_map(|item| item.performance.iter())
            .map(|perf| perf.metrics.len())
            .sum();

        ReportStats {
            num_reports: self.reports.len(),
            num_customers: customers.count(),
            num_items: items.len(),
            num_metrics,
        }
    }
}

/// SUSHI `Exception` elements that actually carry content
fn collect_exceptions(doc: &XmlDocument) -> Vec<SushiException> {
    doc.descendants(SUSHI_NS, "Exception")
        .into_iter()
        .filter(|e| e.elements().next().is_some())
        .map(|e| SushiException {
            number: e.text_at(SUSHI_NS, &["Number"]).unwrap_or_default(),
            severity: e.text_at(SUSHI_NS, &["Severity"]).unwrap_or_default(),
            message: e.text_at(SUSHI_NS, &["Message"]).unwrap_or_default(),
        })
        .collect()
}

fn required_attribute<'a>(element: &'a XmlElement, name: &str) -> Result<&'a str> {
    element
        .attribute(name)
        .ok_or_else(|| DecoderError::MissingAttribute {
            attribute: name.to_string(),
            element: element.name.clone(),
        })
}

/// Per-document decoding state
struct ReportDecoder {
    report_type: ReportType,
}

impl ReportDecoder {
    fn parse_report(&self, report: &XmlElement) -> Result<CounterReport> {
        let attr = |name: &str| report.attribute(name).unwrap_or_default().to_string();
        let text = |path: &[&str]| report.text_at(COUNTER_NS, path).unwrap_or_default();

        let created = report
            .attribute("Created")
            .and_then(parse_timestamp)
            .unwrap_or_default();

        let mut counter_report = CounterReport {
            id: attr("ID"),
            name: attr("Name"),
            title: attr("Title"),
            version: attr("Version"),
            created,
            vendor: Vendor {
                id: text(&["Vendor", "ID"]),
                name: text(&["Vendor", "Name"]),
                contact_email: text(&["Vendor", "Contact", "E-mail"]),
                website_url: text(&["Vendor", "WebSiteUrl"]),
                logo_url: text(&["Vendor", "LogoUrl"]),
            },
            customers: Vec::new(),
        };

        log::debug!(
            "Report '{}' from vendor '{}'",
            counter_report.id,
            counter_report.vendor.name
        );

        for customer in report.children_named(COUNTER_NS, "Customer") {
            counter_report.customers.push(self.parse_customer(customer)?);
        }

        Ok(counter_report)
    }

    fn parse_customer(&self, customer: &XmlElement) -> Result<CustomerReport> {
        let text = |path: &[&str]| customer.text_at(COUNTER_NS, path).unwrap_or_default();

        let mut customer_report = CustomerReport {
            id: text(&["ID"]),
            name: text(&["Name"]),
            consortium_code: text(&["Consortium", "Code"]),
            consortium_name: text(&["Consortium", "WellKnownName"]),
            items: Vec::new(),
        };

        for (index, item) in customer.children_named(COUNTER_NS, "ReportItems").enumerate() {
            let item = self.parse_item(item, &customer_report.id, index)?;
            customer_report.items.push(item);
        }

        log::debug!(
            "Customer '{}' ({}): {} item(s)",
            customer_report.id,
            customer_report.name,
            customer_report.items.len()
        );

        Ok(customer_report)
    }

    fn parse_item(&self, item: &XmlElement, customer_id: &str, index: usize) -> Result<ReportItem> {
        let required = |name: &str| {
            item.text_at(COUNTER_NS, &[name])
                .ok_or_else(|| DecoderError::MissingElement {
                    element: name.to_string(),
                    context: format!("customer '{}' item #{}", customer_id, index + 1),
                })
        };

        let mut identifiers = ItemIdentifiers::empty(self.report_type.item_kind());
        if !matches!(identifiers, ItemIdentifiers::Generic) {
            for identifier in item.children_named(COUNTER_NS, "ItemIdentifier") {
                let id_type = identifier.text_at(COUNTER_NS, &["Type"]);
                let value = identifier.text_at(COUNTER_NS, &["Value"]);
                match (id_type, value) {
                    (Some(id_type), Some(value)) => {
                        if !apply_identifier(&mut identifiers, &id_type, value) {
                            log::trace!("Ignoring identifier type '{}'", id_type);
                        }
                    }
                    _ => log::warn!(
                        "Skipping incomplete ItemIdentifier (customer '{}' item #{})",
                        customer_id,
                        index + 1
                    ),
                }
            }
        }

        let mut report_item = ReportItem {
            name: required("ItemName")?,
            publisher: required("ItemPublisher")?,
            platform: required("ItemPlatform")?,
            identifiers,
            performance: Vec::new(),
        };

        for perf in item.children_named(COUNTER_NS, "ItemPerformance") {
            let performance = self.parse_performance(perf, &report_item.name)?;
            report_item.performance.push(performance);
        }

        log::trace!(
            "Item '{}': {} performance block(s)",
            report_item.name,
            report_item.performance.len()
        );

        Ok(report_item)
    }

    fn parse_performance(&self, perf: &XmlElement, item_name: &str) -> Result<PerformanceItem> {
        let mut performance = PerformanceItem::new(year_of_publication(perf));

        let start = period_date(perf, "Begin", item_name);
        let end = period_date(perf, "End", item_name);

        let category_text = perf.text_at(COUNTER_NS, &["Category"]).unwrap_or_default();
        let category = MetricCategory::parse(&category_text).unwrap_or_else(|| {
            log::warn!(
                "Found invalid metric category '{}' for item '{}'",
                category_text,
                item_name
            );
            MetricCategory::Invalid
        });

        let mut metric = CounterMetric::new(start, end, category);
        for instance in perf.children_named(COUNTER_NS, "Instance") {
            metric.instances.push(parse_instance(instance, item_name)?);
        }

        if let Some(replaced) = performance.metrics.insert(metric) {
            log::warn!(
                "Replaced metric bucket {}..{} {} for item '{}'",
                replaced.start,
                replaced.end,
                replaced.category,
                item_name
            );
        }

        Ok(performance)
    }
}

/// Store an identifier in the slot its type maps to; false if the type is unknown
fn apply_identifier(identifiers: &mut ItemIdentifiers, id_type: &str, value: String) -> bool {
    let id_type = id_type.trim().to_ascii_lowercase();
    match identifiers {
        ItemIdentifiers::Journal(ids) | ItemIdentifiers::Consortium(ids) => {
            let slot = match id_type.as_str() {
                "issn" | "print_issn" => &mut ids.print_issn,
                "online_issn" => &mut ids.online_issn,
                "doi" => &mut ids.doi,
                "proprietary" => &mut ids.proprietary,
                _ => return false,
            };
            *slot = value;
            true
        }
        ItemIdentifiers::Book(ids) => {
            let slot = match id_type.as_str() {
                "isbn" | "print_isbn" => &mut ids.print_isbn,
                "online_isbn" | "online_issn" => &mut ids.online_issn,
                "doi" => &mut ids.doi,
                "proprietary" => &mut ids.proprietary,
                _ => return false,
            };
            *slot = value;
            true
        }
        ItemIdentifiers::Generic => false,
    }
}

/// YOP qualifier from `PubYr`, `PubYrFrom`/`PubYrTo` or `PubYrTo` alone
fn year_of_publication(perf: &XmlElement) -> String {
    if let Some(year) = perf.attribute("PubYr") {
        return year.to_string();
    }
    match (perf.attribute("PubYrFrom"), perf.attribute("PubYrTo")) {
        (Some(from), Some(to)) => format!("{}-{}", from, to),
        (None, Some(to)) => format!("<= {}", to),
        _ => String::new(),
    }
}

fn period_date(perf: &XmlElement, bound: &str, item_name: &str) -> NaiveDate {
    let text = perf.text_at(COUNTER_NS, &["Period", bound]).unwrap_or_default();
    parse_date(&text).unwrap_or_else(|| {
        log::warn!(
            "Unparsable period {} '{}' for item '{}', using default date",
            bound,
            text,
            item_name
        );
        NaiveDate::default()
    })
}

fn parse_instance(instance: &XmlElement, item_name: &str) -> Result<MetricInstance> {
    let missing = |element: &str| DecoderError::MissingElement {
        element: element.to_string(),
        context: format!("Instance of item '{}'", item_name),
    };

    let type_text = instance
        .text_at(COUNTER_NS, &["MetricType"])
        .ok_or_else(|| missing("MetricType"))?;
    let metric_type = MetricType::parse(&type_text).ok_or_else(|| DecoderError::UnknownMetricType {
        value: type_text.clone(),
        item: item_name.to_string(),
    })?;

    let count_text = instance
        .text_at(COUNTER_NS, &["Count"])
        .ok_or_else(|| missing("Count"))?;
    let count = count_text
        .trim()
        .parse::<u64>()
        .map_err(|_| DecoderError::InvalidCount {
            value: count_text.clone(),
            item: item_name.to_string(),
        })?;

    Ok(MetricInstance { metric_type, count })
}

/// Best-effort date: plain date, RFC 3339 timestamp or local timestamp
fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(text).map(|ts| ts.date()))
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
