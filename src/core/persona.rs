/// Selectable voice blended into the outgoing system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persona {
    #[default]
    Default,
    Coder,
    Teacher,
    Creative,
}

impl Persona {
    pub const ALL: [Persona; 4] = [
        Persona::Default,
        Persona::Coder,
        Persona::Teacher,
        Persona::Creative,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Persona::Default => "default",
            Persona::Coder => "coder",
            Persona::Teacher => "teacher",
            Persona::Creative => "creative",
        }
    }

    /// Parse a stored or user-supplied persona id. Unknown values fall
    /// back to the default persona rather than erroring, so a stale
    /// preference slot can never block startup.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "coder" => Persona::Coder,
            "teacher" => Persona::Teacher,
            "creative" => Persona::Creative,
            _ => Persona::Default,
        }
    }

    /// Extra instructions appended after the configured system prompt.
    pub fn prompt_suffix(self) -> Option<&'static str> {
        match self {
            Persona::Default => None,
            Persona::Coder => Some(
                "Answer as an experienced software engineer. Prefer concrete, \
                 working code examples over prose.",
            ),
            Persona::Teacher => Some(
                "Explain concepts step by step, the way a patient teacher would, \
                 and close with a short summary.",
            ),
            Persona::Creative => Some(
                "Favor vivid, imaginative language and offer unexpected angles \
                 on the question.",
            ),
        }
    }
}
