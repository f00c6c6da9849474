//! Competition questions

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::constants::stages::MAX_LATEX_LENGTH;

/// A LaTeX question with an optional LaTeX answer
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Question {
    /// Prompt shown to the group
    #[serde(rename = "questionLaTeX")]
    #[garde(length(min = 1, max = MAX_LATEX_LENGTH))]
    pub question_latex: String,
    /// Answer revealed after the timer or the proctor ends the question
    #[serde(rename = "answerLaTeX", default)]
    #[garde(length(max = MAX_LATEX_LENGTH))]
    pub answer_latex: Option<String>,
}

impl Question {
    /// Creates a question with an answer
    pub fn new(question_latex: impl Into<String>, answer_latex: impl Into<String>) -> Self {
        Self {
            question_latex: question_latex.into(),
            answer_latex: Some(answer_latex.into()),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let q: Question =
            serde_json::from_str(r#"{"questionLaTeX":"\\int x\\,dx","answerLaTeX":"x^2/2"}"#)
                .unwrap();
        assert_eq!(q.question_latex, "\\int x\\,dx");
        assert_eq!(q.answer_latex.as_deref(), Some("x^2/2"));

        let without_answer: Question = serde_json::from_str(r#"{"questionLaTeX":"1+1"}"#).unwrap();
        assert_eq!(without_answer.answer_latex, None);
        assert_eq!(
            serde_json::to_string(&without_answer).unwrap(),
            r#"{"questionLaTeX":"1+1"}"#
        );
    }

    #[test]
    fn test_validation() {
        assert!(Question::new("\\int_0^1 x\\,dx", "1/2").validate().is_ok());
        assert!(Question::new("", "1/2").validate().is_err());
        assert!(
            Question::new("x", "y".repeat(MAX_LATEX_LENGTH + 1))
                .validate()
                .is_err()
        );
    }
}
