use serde::{Deserialize, Serialize};

/// Coaching tone categories. Each one maps to exactly one remote voice
/// profile, so lookup is total and never fails for a valid style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CoachingStyle {
    Motivational,
    Technical,
    Supportive,
    Professional,
}

/// Per-style synthesis parameters for the remote voice service.
/// Pure data, initialized once, safe for concurrent reads.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceProfile {
    /// Opaque remote voice identity.
    pub voice_id: &'static str,
    /// Voice consistency across a phrase (0.0 - 1.0).
    pub stability: f32,
    /// How closely the output tracks the reference voice (0.0 - 1.0).
    pub similarity: f32,
    /// Expressive range of the delivery (0.0 - 1.0).
    pub expressiveness: f32,
    /// Whether the remote service should boost speaker presence.
    pub speaker_boost: bool,
}

const MOTIVATIONAL: VoiceProfile = VoiceProfile {
    voice_id: "vx_coach_blaze",
    stability: 0.35,
    similarity: 0.75,
    expressiveness: 0.9,
    speaker_boost: true,
};

const TECHNICAL: VoiceProfile = VoiceProfile {
    voice_id: "vx_coach_slate",
    stability: 0.8,
    similarity: 0.9,
    expressiveness: 0.2,
    speaker_boost: false,
};

const SUPPORTIVE: VoiceProfile = VoiceProfile {
    voice_id: "vx_coach_willow",
    stability: 0.6,
    similarity: 0.8,
    expressiveness: 0.55,
    speaker_boost: true,
};

const PROFESSIONAL: VoiceProfile = VoiceProfile {
    voice_id: "vx_coach_sterling",
    stability: 0.75,
    similarity: 0.85,
    expressiveness: 0.3,
    speaker_boost: false,
};

impl CoachingStyle {
    pub fn profile(&self) -> &'static VoiceProfile {
        match self {
            CoachingStyle::Motivational => &MOTIVATIONAL,
            CoachingStyle::Technical => &TECHNICAL,
            CoachingStyle::Supportive => &SUPPORTIVE,
            CoachingStyle::Professional => &PROFESSIONAL,
        }
    }

    pub fn all() -> [CoachingStyle; 4] {
        [
            CoachingStyle::Motivational,
            CoachingStyle::Technical,
            CoachingStyle::Supportive,
            CoachingStyle::Professional,
        ]
    }
}
