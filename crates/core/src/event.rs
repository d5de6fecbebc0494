use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::error::CoreError;

/// Open property bag attached to every buyer event.
pub type Properties = serde_json::Map<String, Value>;

/// Kind of buyer interaction. Unknown strings are preserved as [`EventType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    ViewPlan,
    ZoomLot,
    DownloadBrochure,
    ChatMessage,
    CtaClick,
    ReturnVisit,
    ScheduleTour,
    PricingInquiry,
    CustomizationRequest,
    TimelineInquiry,
    FinancingQuestion,
    RepeatVisitor,
    Custom(String),
}

impl EventType {
    /// All built-in event types in their canonical order.
    pub const KNOWN: [EventType; 12] = [
        EventType::ViewPlan,
        EventType::ZoomLot,
        EventType::DownloadBrochure,
        EventType::ChatMessage,
        EventType::CtaClick,
        EventType::ReturnVisit,
        EventType::ScheduleTour,
        EventType::PricingInquiry,
        EventType::CustomizationRequest,
        EventType::TimelineInquiry,
        EventType::FinancingQuestion,
        EventType::RepeatVisitor,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            EventType::ViewPlan => "view_plan",
            EventType::ZoomLot => "zoom_lot",
            EventType::DownloadBrochure => "download_brochure",
            EventType::ChatMessage => "chat_message",
            EventType::CtaClick => "cta_click",
            EventType::ReturnVisit => "return_visit",
            EventType::ScheduleTour => "schedule_tour",
            EventType::PricingInquiry => "pricing_inquiry",
            EventType::CustomizationRequest => "customization_request",
            EventType::TimelineInquiry => "timeline_inquiry",
            EventType::FinancingQuestion => "financing_question",
            EventType::RepeatVisitor => "repeat_visitor",
            EventType::Custom(s) => s.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventType::Custom(_))
    }

    /// Blank types count as missing when events are validated.
    pub fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s {
            "view_plan" => EventType::ViewPlan,
            "zoom_lot" => EventType::ZoomLot,
            "download_brochure" => EventType::DownloadBrochure,
            "chat_message" => EventType::ChatMessage,
            "cta_click" => EventType::CtaClick,
            "return_visit" => EventType::ReturnVisit,
            "schedule_tour" => EventType::ScheduleTour,
            "pricing_inquiry" => EventType::PricingInquiry,
            "customization_request" => EventType::CustomizationRequest,
            "timeline_inquiry" => EventType::TimelineInquiry,
            "financing_question" => EventType::FinancingQuestion,
            "repeat_visitor" => EventType::RepeatVisitor,
            other => EventType::Custom(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        match EventType::from(s.as_str()) {
            EventType::Custom(_) => EventType::Custom(s),
            known => known,
        }
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        match t {
            EventType::Custom(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded interaction by a prospective buyer.
///
/// `event_type` is optional at the serde level so that a missing `type` field
/// can be reported as invalid input when the evaluation context is built,
/// rather than as an opaque deserialization failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyerEvent {
    #[serde(alias = "ts")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    #[serde(default, alias = "props")]
    pub properties: Properties,
}

impl BuyerEvent {
    pub fn new(timestamp: DateTime<Utc>, event_type: impl Into<EventType>) -> Self {
        Self {
            timestamp,
            event_type: Some(event_type.into()),
            properties: Properties::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn is_type(&self, event_type: &EventType) -> bool {
        self.event_type.as_ref() == Some(event_type)
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Text value of a property, if it is a string.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.prop(key).and_then(Value::as_str)
    }

    /// Numeric value of a property. Numeric strings such as `"400"` are accepted.
    pub fn prop_f64(&self, key: &str) -> Option<f64> {
        match self.prop(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Parse a JSON array of events.
pub fn parse_events(json: &str) -> Result<Vec<BuyerEvent>, CoreError> {
    serde_json::from_str(json).map_err(|e| CoreError::Serialize(e.to_string()))
}

/// Read and parse a JSON file holding an array of events.
pub fn load_events(path: &Path) -> Result<Vec<BuyerEvent>, CoreError> {
    let contents = std::fs::read_to_string(path)?;
    parse_events(&contents)
}
