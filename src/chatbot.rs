//! Rule-based chat assistant.
//!
//! `respond` lower-cases the input and walks an ordered rule list; the first
//! rule whose keyword predicate matches produces the reply. No state is kept
//! between calls; the transcript lives in the session.

const GREETING_KEYWORDS: &[&str] = &["hi", "hello", "hey", "good morning", "good afternoon"];
const FAREWELL_KEYWORDS: &[&str] = &["bye", "goodbye", "see you", "thanks"];
const SYMPTOM_KEYWORDS: &[&str] = &["cough", "cold", "fever", "headache", "pain"];

pub const GREETING_REPLY: &str =
    "Hello! I'm your healthcare assistant. How can I help you today?";

pub const FAREWELL_REPLY: &str =
    "Goodbye! Feel free to reach out if you have any more questions.";

pub const COUGH_REPLY: &str = "For cough, you can try these home remedies:
- Honey and warm water
- Ginger tea
- Steam inhalation
- Saltwater gargle

If symptoms persist for more than 3 days, please consult a doctor.";

pub const COLD_REPLY: &str = "For cold symptoms:
- Stay hydrated
- Get plenty of rest
- Use a humidifier
- Try chicken soup

Over-the-counter cold medicines may help, but consult a pharmacist first.";

pub const FEVER_REPLY: &str = "For fever management:
- Stay hydrated
- Rest
- Take paracetamol as directed
- Use cool compresses

If fever is above 102°F (39°C) or lasts more than 3 days, seek medical attention.";

/// Shared reply for symptom keywords without a dedicated remedy text
/// (headache, pain). See DESIGN.md for the resolution of the original
/// fallthrough behavior.
pub const GENERAL_SYMPTOM_REPLY: &str = "For that, rest and plenty of fluids usually help, \
but I can't recommend a specific medicine. Please consult a doctor or pharmacist.";

pub const APPOINTMENT_REPLY: &str = "You can schedule an appointment with our doctors through \
the 'Our Expert Doctors' page. Would you like me to take you there?";

pub const AVAILABILITY_REPLY: &str = "You can check hospital availability on the \
'Hospital Availability' page. Would you like me to direct you there?";

pub const FALLBACK_REPLY: &str = "I'm sorry, I didn't understand your question. I can help \
with information about medicines, appointments, and hospital availability. Please try asking \
in a different way.";

/// One rule: a predicate over the lower-cased input and the reply it yields.
struct Rule {
    matches: fn(&str) -> bool,
    reply: fn(&str) -> &'static str,
}

/// Evaluated top to bottom, first match wins.
const RULES: &[Rule] = &[
    Rule {
        matches: is_greeting,
        reply: |_| GREETING_REPLY,
    },
    Rule {
        matches: is_farewell,
        reply: |_| FAREWELL_REPLY,
    },
    Rule {
        matches: is_medicine_query,
        reply: remedy_reply,
    },
    Rule {
        matches: |input| input.contains("appointment"),
        reply: |_| APPOINTMENT_REPLY,
    },
    Rule {
        matches: |input| input.contains("hospital") || input.contains("availability"),
        reply: |_| AVAILABILITY_REPLY,
    },
];

pub fn respond(input: &str) -> &'static str {
    let input = input.to_lowercase();
    RULES
        .iter()
        .find(|rule| (rule.matches)(&input))
        .map(|rule| (rule.reply)(&input))
        .unwrap_or(FALLBACK_REPLY)
}

fn contains_any(input: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| input.contains(keyword))
}

fn is_greeting(input: &str) -> bool {
    contains_any(input, GREETING_KEYWORDS)
}

fn is_farewell(input: &str) -> bool {
    contains_any(input, FAREWELL_KEYWORDS)
}

fn is_medicine_query(input: &str) -> bool {
    input.contains("medicine") && contains_any(input, SYMPTOM_KEYWORDS)
}

fn remedy_reply(input: &str) -> &'static str {
    if input.contains("cough") {
        COUGH_REPLY
    } else if input.contains("cold") {
        COLD_REPLY
    } else if input.contains("fever") {
        FEVER_REPLY
    } else {
        GENERAL_SYMPTOM_REPLY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_is_case_insensitive() {
        assert_eq!(respond("hello"), GREETING_REPLY);
        assert_eq!(respond("Hi there"), GREETING_REPLY);
        assert_eq!(respond("GOOD MORNING doctor"), GREETING_REPLY);
    }

    #[test]
    fn test_farewell_takes_precedence_over_fallback() {
        assert_eq!(respond("thanks, bye"), FAREWELL_REPLY);
        assert_eq!(respond("see you tomorrow"), FAREWELL_REPLY);
    }

    #[test]
    fn test_medicine_with_known_symptom() {
        assert_eq!(respond("I need medicine for my cough"), COUGH_REPLY);
        assert_eq!(respond("any medicine for a cold?"), COLD_REPLY);
        assert_eq!(respond("medicine to bring down fever"), FEVER_REPLY);
    }

    #[test]
    fn test_medicine_with_other_symptom_gets_general_reply() {
        // Pins the resolved behavior: headache/pain do not fall through to
        // the appointment/hospital rules or the fallback.
        assert_eq!(respond("I need medicine for my headache"), GENERAL_SYMPTOM_REPLY);
        assert_eq!(respond("medicine for back pain"), GENERAL_SYMPTOM_REPLY);
    }

    #[test]
    fn test_symptom_without_medicine_keyword_is_not_a_remedy_query() {
        assert_eq!(respond("I have a cough"), FALLBACK_REPLY);
    }

    #[test]
    fn test_navigation_hints() {
        assert_eq!(respond("how do I book an appointment?"), APPOINTMENT_REPLY);
        assert_eq!(respond("is the hospital open?"), AVAILABILITY_REPLY);
        assert_eq!(respond("availability today?"), AVAILABILITY_REPLY);
    }

    #[test]
    fn test_fallback_for_unknown_input() {
        assert_eq!(respond("what's the weather like?"), FALLBACK_REPLY);
    }
}
