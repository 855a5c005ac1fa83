//! # Widget Kinds
//!
//! The closed set of widget behaviors the studio knows how to render and edit.
//!
//! Every node in a document names its widget by a string tag. The resolver
//! maps that tag to one of the kinds below, and the kind supplies:
//!
//! - **Default props**: the property bag a freshly added widget starts with
//! - **Render**: a host-neutral description of what to draw
//! - **Property editor**: the fields shown in the side panel when selected
//!
//! Pixel layout and the AI/quiz business logic live in the host; the engine
//! only needs enough to drive the editor chrome.

use crate::document::{Node, NodeId, Props};
use crate::mutations::Command;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    Canvas,
    Container,
    Header,
    Footer,
    Text,
    Image,
    Video,
    Slider,
    Quiz,
    AiTutor,
    Simulation,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 11] = [
        WidgetKind::Canvas,
        WidgetKind::Container,
        WidgetKind::Header,
        WidgetKind::Footer,
        WidgetKind::Text,
        WidgetKind::Image,
        WidgetKind::Video,
        WidgetKind::Slider,
        WidgetKind::Quiz,
        WidgetKind::AiTutor,
        WidgetKind::Simulation,
    ];

    /// Tag this kind is registered under in the builtin table
    pub fn tag(self) -> &'static str {
        match self {
            WidgetKind::Canvas => "canvas",
            WidgetKind::Container => "container",
            WidgetKind::Header => "header",
            WidgetKind::Footer => "footer",
            WidgetKind::Text => "text",
            WidgetKind::Image => "image",
            WidgetKind::Video => "video",
            WidgetKind::Slider => "slider",
            WidgetKind::Quiz => "quiz",
            WidgetKind::AiTutor => "ai-tutor",
            WidgetKind::Simulation => "simulation",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Whether nodes of this kind may hold children
    pub fn accepts_children(self) -> bool {
        matches!(
            self,
            WidgetKind::Canvas | WidgetKind::Container | WidgetKind::Header | WidgetKind::Footer
        )
    }

    pub fn default_props(self) -> Props {
        let value = match self {
            WidgetKind::Canvas => json!({ "background": "#ffffff", "padding": 16 }),
            WidgetKind::Container => json!({
                "background": "transparent",
                "padding": 8,
                "flexDirection": "column",
            }),
            WidgetKind::Header => json!({ "title": "Untitled lesson", "background": "#f5f5f5" }),
            WidgetKind::Footer => json!({ "text": "", "background": "#f5f5f5" }),
            WidgetKind::Text => json!({ "text": "Edit me", "fontSize": 16, "color": "#000000" }),
            WidgetKind::Image => json!({ "src": "", "alt": "", "width": 320 }),
            WidgetKind::Video => json!({ "src": "", "autoplay": false, "controls": true }),
            WidgetKind::Slider => json!({
                "label": "Value",
                "min": 0,
                "max": 100,
                "step": 1,
                "value": 50,
            }),
            WidgetKind::Quiz => json!({
                "question": "",
                "options": ["Option A", "Option B"],
                "correctIndex": 0,
            }),
            WidgetKind::AiTutor => json!({ "prompt": "", "persona": "friendly", "enabled": true }),
            WidgetKind::Simulation => json!({ "src": "", "height": 400, "interactive": true }),
        };

        match value {
            Value::Object(map) => map,
            _ => Props::new(),
        }
    }

    /// Describe how a node of this kind should be drawn
    pub fn render(self, node: &Node) -> RenderOutput {
        let (element, label_prop) = match self {
            WidgetKind::Canvas => ("main", None),
            WidgetKind::Container => ("section", None),
            WidgetKind::Header => ("header", Some("title")),
            WidgetKind::Footer => ("footer", Some("text")),
            WidgetKind::Text => ("p", Some("text")),
            WidgetKind::Image => ("img", Some("alt")),
            WidgetKind::Video => ("video", Some("src")),
            WidgetKind::Slider => ("input", Some("label")),
            WidgetKind::Quiz => ("form", Some("question")),
            WidgetKind::AiTutor => ("aside", Some("persona")),
            WidgetKind::Simulation => ("iframe", Some("src")),
        };

        let label = label_prop
            .and_then(|key| node.props.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        RenderOutput {
            node_id: node.id.clone(),
            element,
            label,
            children: node.children.clone(),
            opaque: false,
        }
    }

    /// Fields the side panel shows for this kind
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            WidgetKind::Canvas => &CANVAS_FIELDS,
            WidgetKind::Container => &CONTAINER_FIELDS,
            WidgetKind::Header => &HEADER_FIELDS,
            WidgetKind::Footer => &FOOTER_FIELDS,
            WidgetKind::Text => &TEXT_FIELDS,
            WidgetKind::Image => &IMAGE_FIELDS,
            WidgetKind::Video => &VIDEO_FIELDS,
            WidgetKind::Slider => &SLIDER_FIELDS,
            WidgetKind::Quiz => &QUIZ_FIELDS,
            WidgetKind::AiTutor => &AI_TUTOR_FIELDS,
            WidgetKind::Simulation => &SIMULATION_FIELDS,
        }
    }

    /// Build the property panel for a node of this kind
    pub fn property_editor(self, node: &Node) -> PropertyPanel {
        let fields = self
            .fields()
            .iter()
            .map(|spec| PropertyField {
                name: spec.name,
                label: spec.label,
                control: spec.control,
                value: node.props.get(spec.name).cloned().unwrap_or(Value::Null),
            })
            .collect();

        PropertyPanel {
            node_id: node.id.clone(),
            fields,
        }
    }
}

/// Host-neutral render description of one node
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub node_id: NodeId,
    /// Semantic element the host should draw
    pub element: &'static str,
    /// Short human-readable label (used for outlines and accessibility)
    pub label: String,
    /// Children in render order
    pub children: Vec<NodeId>,
    /// True when the widget type is unknown and the node is kept verbatim
    pub opaque: bool,
}

impl RenderOutput {
    pub fn placeholder(node: &Node) -> Self {
        Self {
            node_id: node.id.clone(),
            element: "div",
            label: format!("Unsupported widget: {}", node.widget),
            children: node.children.clone(),
            opaque: true,
        }
    }
}

/// Editing control used for a property field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    Text,
    TextArea,
    Number { min: f64, max: f64, step: f64 },
    Toggle,
    Color,
    Url,
    Choice(&'static [&'static str]),
    List,
}

impl Control {
    /// Whether `value` is acceptable for this control
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Control::Text | Control::TextArea | Control::Url => value.is_string(),
            Control::Color => value
                .as_str()
                .map(|s| s.starts_with('#') || s == "transparent")
                .unwrap_or(false),
            Control::Number { min, max, .. } => value
                .as_f64()
                .map(|n| n >= *min && n <= *max)
                .unwrap_or(false),
            Control::Toggle => value.is_boolean(),
            Control::Choice(options) => value
                .as_str()
                .map(|s| options.contains(&s))
                .unwrap_or(false),
            Control::List => value.is_array(),
        }
    }

    fn expected(&self) -> String {
        match self {
            Control::Text | Control::TextArea | Control::Url => "a string".to_string(),
            Control::Color => "a hex color".to_string(),
            Control::Number { min, max, .. } => format!("a number between {} and {}", min, max),
            Control::Toggle => "a boolean".to_string(),
            Control::Choice(options) => format!("one of {}", options.join(", ")),
            Control::List => "a list".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub control: Control,
}

const fn field(name: &'static str, label: &'static str, control: Control) -> FieldSpec {
    FieldSpec {
        name,
        label,
        control,
    }
}

const PADDING: Control = Control::Number {
    min: 0.0,
    max: 256.0,
    step: 1.0,
};

static CANVAS_FIELDS: [FieldSpec; 2] = [
    field("background", "Background", Control::Color),
    field("padding", "Padding", PADDING),
];

static CONTAINER_FIELDS: [FieldSpec; 3] = [
    field("background", "Background", Control::Color),
    field("padding", "Padding", PADDING),
    field(
        "flexDirection",
        "Direction",
        Control::Choice(&["column", "row"]),
    ),
];

static HEADER_FIELDS: [FieldSpec; 2] = [
    field("title", "Title", Control::Text),
    field("background", "Background", Control::Color),
];

static FOOTER_FIELDS: [FieldSpec; 2] = [
    field("text", "Text", Control::Text),
    field("background", "Background", Control::Color),
];

static TEXT_FIELDS: [FieldSpec; 3] = [
    field("text", "Text", Control::TextArea),
    field(
        "fontSize",
        "Font size",
        Control::Number {
            min: 8.0,
            max: 96.0,
            step: 1.0,
        },
    ),
    field("color", "Color", Control::Color),
];

static IMAGE_FIELDS: [FieldSpec; 3] = [
    field("src", "Source", Control::Url),
    field("alt", "Alt text", Control::Text),
    field(
        "width",
        "Width",
        Control::Number {
            min: 16.0,
            max: 4096.0,
            step: 1.0,
        },
    ),
];

static VIDEO_FIELDS: [FieldSpec; 3] = [
    field("src", "Source", Control::Url),
    field("autoplay", "Autoplay", Control::Toggle),
    field("controls", "Show controls", Control::Toggle),
];

const SLIDER_RANGE: Control = Control::Number {
    min: f64::MIN,
    max: f64::MAX,
    step: 1.0,
};

static SLIDER_FIELDS: [FieldSpec; 5] = [
    field("label", "Label", Control::Text),
    field("min", "Minimum", SLIDER_RANGE),
    field("max", "Maximum", SLIDER_RANGE),
    field("step", "Step", SLIDER_RANGE),
    field("value", "Initial value", SLIDER_RANGE),
];

static QUIZ_FIELDS: [FieldSpec; 3] = [
    field("question", "Question", Control::TextArea),
    field("options", "Options", Control::List),
    field(
        "correctIndex",
        "Correct option",
        Control::Number {
            min: 0.0,
            max: 64.0,
            step: 1.0,
        },
    ),
];

static AI_TUTOR_FIELDS: [FieldSpec; 3] = [
    field("prompt", "System prompt", Control::TextArea),
    field(
        "persona",
        "Persona",
        Control::Choice(&["friendly", "socratic", "concise"]),
    ),
    field("enabled", "Enabled", Control::Toggle),
];

static SIMULATION_FIELDS: [FieldSpec; 3] = [
    field("src", "Source", Control::Url),
    field(
        "height",
        "Height",
        Control::Number {
            min: 100.0,
            max: 2000.0,
            step: 10.0,
        },
    ),
    field("interactive", "Interactive", Control::Toggle),
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    #[error("Widget has no editable field '{0}'")]
    UnknownField(String),

    #[error("Field '{field}' expects {expected}")]
    InvalidValue { field: String, expected: String },
}

/// A single editable field in the property panel
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyField {
    pub name: &'static str,
    pub label: &'static str,
    pub control: Control,
    pub value: Value,
}

/// The side panel contents for the selected node
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPanel {
    pub node_id: NodeId,
    pub fields: Vec<PropertyField>,
}

impl PropertyPanel {
    pub fn empty(node_id: NodeId) -> Self {
        Self {
            node_id,
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&PropertyField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Turn a panel edit into a `SetProps` command after checking the value
    pub fn edit(&self, name: &str, value: Value) -> Result<Command, PropertyError> {
        let field = self
            .field(name)
            .ok_or_else(|| PropertyError::UnknownField(name.to_string()))?;

        if !field.control.accepts(&value) {
            return Err(PropertyError::InvalidValue {
                field: name.to_string(),
                expected: field.control.expected(),
            });
        }

        let mut props = Props::new();
        props.insert(name.to_string(), value);

        Ok(Command::SetProps {
            node_id: self.node_id.clone(),
            props,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for kind in WidgetKind::ALL {
            assert_eq!(WidgetKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(WidgetKind::from_tag("legacy-widget"), None);
    }

    #[test]
    fn test_every_field_has_a_default() {
        for kind in WidgetKind::ALL {
            let defaults = kind.default_props();
            for spec in kind.fields() {
                assert!(
                    defaults.contains_key(spec.name),
                    "{} is missing a default for {}",
                    kind.tag(),
                    spec.name
                );
            }
        }
    }

    #[test]
    fn test_render_uses_label_prop() {
        let node = Node::new("t1", "text", WidgetKind::Text.default_props());
        let out = WidgetKind::Text.render(&node);
        assert_eq!(out.element, "p");
        assert_eq!(out.label, "Edit me");
        assert!(!out.opaque);
    }

    #[test]
    fn test_panel_edit_validates_values() {
        let node = Node::new("s1", "slider", WidgetKind::Slider.default_props());
        let panel = WidgetKind::Slider.property_editor(&node);

        assert_eq!(panel.field("value").map(|f| f.value.clone()), Some(json!(50)));

        let command = panel.edit("label", json!("Speed")).unwrap();
        match command {
            Command::SetProps { node_id, props } => {
                assert_eq!(node_id, "s1");
                assert_eq!(props.get("label"), Some(&json!("Speed")));
            }
            other => panic!("Expected SetProps, got {:?}", other),
        }

        assert!(matches!(
            panel.edit("label", json!(3)),
            Err(PropertyError::InvalidValue { .. })
        ));
        assert!(matches!(
            panel.edit("nope", json!(3)),
            Err(PropertyError::UnknownField(_))
        ));
    }

    #[test]
    fn test_choice_control() {
        let control = Control::Choice(&["row", "column"]);
        assert!(control.accepts(&json!("row")));
        assert!(!control.accepts(&json!("grid")));
    }
}
