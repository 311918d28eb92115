use serde::Serialize;
use std::fmt;

pub const SYSTEM_PROMPT: &str = "
You are a friendly Travel Booking & Policy Explainer Bot.

You explain clearly:
- booking steps
- cancellation & refund rules
- documentation requirements
- travel policy guidance
- safe travel tips

Rules:
- Do NOT book or cancel tickets
- Do NOT take payments
- Do NOT ask personal details
- Do NOT provide exact fares

Style:
- Friendly
- Step-by-step
- Easy to understand
";

pub const GREETING: &str =
    "👋 Hello! I'm **TravelBot**. Ask me about booking steps, cancellations, refunds, documents, or travel rules!";

/// A sidebar quick-help entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub id: &'static str,
    pub label: &'static str,
    pub question: &'static str,
}

pub const PRESETS: [Preset; 5] = [
    Preset {
        id: "booking_process",
        label: "Booking Process",
        question: "Explain travel ticket booking process",
    },
    Preset {
        id: "cancellation_rules",
        label: "Cancellation Rules",
        question: "Explain flight cancellation policy",
    },
    Preset {
        id: "refund_policy",
        label: "Refund Policy",
        question: "Explain refund rules for cancelled tickets",
    },
    Preset {
        id: "travel_documents",
        label: "Travel Documents",
        question: "What documents are required for international travel?",
    },
    Preset {
        id: "general_travel_tips",
        label: "General Travel Tips",
        question: "Give important travel safety & preparation tips",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPreset(pub String);

impl fmt::Display for UnknownPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown preset '{}'", self.0)
    }
}

impl std::error::Error for UnknownPreset {}

pub fn find_preset(id: &str) -> Result<&'static Preset, UnknownPreset> {
    PRESETS.iter()
        .find(|p| p.id == id)
        .ok_or_else(|| UnknownPreset(id.to_string()))
}

/// Instructions followed by the literal user text. Rebuilt for every request.
pub fn build_prompt(instructions: &str, user_text: &str) -> String {
    format!("{}\nUser: {}", instructions, user_text)
}
