use crate::models::CrisisAssessment;

pub const CRISIS_KEYWORDS: [&str; 7] = [
    "suicide",
    "kill myself",
    "end my life",
    "want to die",
    "self-harm",
    "hurt myself",
    "no reason to live",
];

pub const CRISIS_HELPLINE: &str = "100";
pub const CRISIS_MESSAGE: &str = "Please reach out to a crisis helpline immediately.";

/// Case-insensitive substring match against the keyword list.
pub fn check_crisis(message: &str) -> CrisisAssessment {
    let lowered = message.to_lowercase();
    let is_crisis = CRISIS_KEYWORDS.iter().any(|k| lowered.contains(k));

    CrisisAssessment {
        is_crisis,
        helpline: is_crisis.then_some(CRISIS_HELPLINE),
        message: is_crisis.then_some(CRISIS_MESSAGE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_keywords_regardless_of_case() {
        let assessment = check_crisis("Sometimes I feel like I WANT TO DIE");
        assert!(assessment.is_crisis);
        assert_eq!(assessment.helpline, Some("100"));
        assert_eq!(assessment.message, Some(CRISIS_MESSAGE));
    }

    #[test]
    fn ordinary_messages_pass() {
        let assessment = check_crisis("Exams are stressing me out");
        assert_eq!(
            assessment,
            CrisisAssessment { is_crisis: false, helpline: None, message: None }
        );
    }

    #[test]
    fn matches_inside_longer_words() {
        assert!(check_crisis("thinking about self-harming").is_crisis);
        assert!(!check_crisis("").is_crisis);
    }
}
