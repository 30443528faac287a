// src/utils/import.rs
//
// Line-delimited quiz format:
//
//     question|answer 1|answer 2|...|<correct index>[:explanation:<text>]
//
// The correct index is 1-based over the answer fields.

use std::fmt;

use sqlx::PgConnection;

const DELIMITER: char = '|';
const EXPLANATION_MARKER: &str = ":explanation:";

/// Question and answer texts are stored as `VARCHAR(255)`.
pub const MAX_TEXT_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnswer {
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuestion {
    pub text: String,
    pub explanation: String,
    pub answers: Vec<ParsedAnswer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportErrorKind {
    /// Fewer than three fields: no room for an answer and an index.
    TooFewFields { found: usize },
    /// The index field is not an integer.
    InvalidIndex { value: String },
    /// The index does not name any of the answers.
    IndexOutOfRange { index: i64, answers: usize },
    /// A question or answer text longer than `MAX_TEXT_LEN` characters.
    TooLong { field: String },
}

/// A parse failure, tagged with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportError {
    pub line: usize,
    pub kind: ImportErrorKind,
}

impl fmt::Display for ImportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportErrorKind::TooFewFields { found } => write!(
                f,
                "expected at least 3 '|'-separated fields, found {}",
                found
            ),
            ImportErrorKind::InvalidIndex { value } => {
                write!(f, "correct answer index '{}' is not a number", value)
            }
            ImportErrorKind::IndexOutOfRange { index, answers } => write!(
                f,
                "correct answer index {} is outside 1..={}",
                index, answers
            ),
            ImportErrorKind::TooLong { field } => write!(
                f,
                "{} is longer than {} characters",
                field, MAX_TEXT_LEN
            ),
        }
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Import failed at line {}: {}", self.line, self.kind)
    }
}

impl std::error::Error for ImportError {}

/// Parses a single non-blank line into a question and its answers.
pub fn parse_line(line: &str) -> Result<ParsedQuestion, ImportErrorKind> {
    let items: Vec<&str> = line.trim().split(DELIMITER).collect();

    if items.len() < 3 {
        return Err(ImportErrorKind::TooFewFields { found: items.len() });
    }

    let last = items[items.len() - 1];
    let (index_field, explanation) = match last.split_once(EXPLANATION_MARKER) {
        Some((index, explanation)) => (index, explanation.trim()),
        None => (last, ""),
    };

    let correct_index: i64 =
        index_field
            .trim()
            .parse()
            .map_err(|_| ImportErrorKind::InvalidIndex {
                value: index_field.trim().to_string(),
            })?;

    let answer_fields = &items[1..items.len() - 1];
    if correct_index < 1 || correct_index as usize > answer_fields.len() {
        return Err(ImportErrorKind::IndexOutOfRange {
            index: correct_index,
            answers: answer_fields.len(),
        });
    }

    let text = items[0].trim();
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(ImportErrorKind::TooLong {
            field: "question".to_string(),
        });
    }

    let mut answers = Vec::with_capacity(answer_fields.len());
    for (i, field) in answer_fields.iter().enumerate() {
        let answer = field.trim();
        if answer.chars().count() > MAX_TEXT_LEN {
            return Err(ImportErrorKind::TooLong {
                field: format!("answer {}", i + 1),
            });
        }
        answers.push(ParsedAnswer {
            text: answer.to_string(),
            is_correct: (i + 1) as i64 == correct_index,
        });
    }

    Ok(ParsedQuestion {
        text: text.to_string(),
        explanation: explanation.to_string(),
        answers,
    })
}

/// Parses a whole upload. Blank lines are skipped; the first bad line aborts.
pub fn parse_document(text: &str) -> Result<Vec<ParsedQuestion>, ImportError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| parse_line(line).map_err(|kind| ImportError { line: i + 1, kind }))
        .collect()
}

/// Inserts parsed questions into `quiz_id`.
///
/// Callers pass a transaction so that a failing insert discards the batch.
pub async fn insert_questions(
    conn: &mut PgConnection,
    quiz_id: i64,
    questions: &[ParsedQuestion],
) -> Result<usize, sqlx::Error> {
    for question in questions {
        let question_id: i64 = sqlx::query_scalar(
            "INSERT INTO questions (quiz_id, text, explanation) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(quiz_id)
        .bind(&question.text)
        .bind(&question.explanation)
        .fetch_one(&mut *conn)
        .await?;

        for answer in &question.answers {
            sqlx::query("INSERT INTO answers (question_id, text, is_correct) VALUES ($1, $2, $3)")
                .bind(question_id)
                .bind(&answer.text)
                .bind(answer.is_correct)
                .execute(&mut *conn)
                .await?;
        }
    }

    Ok(questions.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_line() {
        let q = parse_line("Q|A1|A2|A3|2").unwrap();
        assert_eq!(q.text, "Q");
        assert_eq!(q.explanation, "");
        assert_eq!(q.answers.len(), 3);
        assert_eq!(
            q.answers.iter().map(|a| a.is_correct).collect::<Vec<_>>(),
            vec![false, true, false]
        );
        assert_eq!(q.answers[1].text, "A2");
    }

    #[test]
    fn test_explanation_marker() {
        let q = parse_line("Q|A1|A2|2:explanation:because").unwrap();
        assert_eq!(q.explanation, "because");
        assert!(q.answers[1].is_correct);
        assert!(!q.answers[0].is_correct);
    }

    #[test]
    fn test_explanation_keeps_later_markers() {
        let q = parse_line("Q|A1|A2|1:explanation:see :explanation: above").unwrap();
        assert_eq!(q.explanation, "see :explanation: above");
    }

    #[test]
    fn test_fields_are_trimmed() {
        let q = parse_line("  What is 2+2? | 4 | 3 | 1  \r").unwrap();
        assert_eq!(q.text, "What is 2+2?");
        assert_eq!(q.answers[0].text, "4");
        assert_eq!(q.answers[1].text, "3");
        assert!(q.answers[0].is_correct);
    }

    #[test]
    fn test_single_answer_is_accepted() {
        let q = parse_line("Q|only|1").unwrap();
        assert_eq!(q.answers.len(), 1);
        assert!(q.answers[0].is_correct);
    }

    #[test]
    fn test_too_few_fields_is_rejected() {
        assert_eq!(
            parse_line("Q|1"),
            Err(ImportErrorKind::TooFewFields { found: 2 })
        );
        assert_eq!(
            parse_line("just a question"),
            Err(ImportErrorKind::TooFewFields { found: 1 })
        );
    }

    #[test]
    fn test_non_numeric_index_is_rejected() {
        assert_eq!(
            parse_line("Q|A1|A2|two"),
            Err(ImportErrorKind::InvalidIndex {
                value: "two".to_string()
            })
        );
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        assert_eq!(
            parse_line("Q|A1|A2|3"),
            Err(ImportErrorKind::IndexOutOfRange { index: 3, answers: 2 })
        );
        assert_eq!(
            parse_line("Q|A1|A2|0"),
            Err(ImportErrorKind::IndexOutOfRange { index: 0, answers: 2 })
        );
    }

    #[test]
    fn test_overlong_texts_are_rejected() {
        let long = "x".repeat(MAX_TEXT_LEN + 1);
        assert_eq!(
            parse_line(&format!("{}|a|b|1", long)),
            Err(ImportErrorKind::TooLong {
                field: "question".to_string()
            })
        );
        assert_eq!(
            parse_line(&format!("Q|a|{}|1", long)),
            Err(ImportErrorKind::TooLong {
                field: "answer 2".to_string()
            })
        );

        let fits = "é".repeat(MAX_TEXT_LEN);
        assert!(parse_line(&format!("{}|{}|1", fits, fits)).is_ok());
    }

    #[test]
    fn test_overlong_line_reports_line_number() {
        let doc = format!("Q1|a|b|1\nQ2|{}|b|1\n", "y".repeat(300));
        let err = parse_document(&doc).unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.to_string().contains("answer 1 is longer than 255"));
    }

    #[test]
    fn test_document_skips_blank_lines() {
        let doc = "Q1|a|b|1\n\n   \nQ2|c|d|e|3\n";
        let questions = parse_document(doc).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].text, "Q2");
        assert!(questions[1].answers[2].is_correct);
    }

    #[test]
    fn test_document_reports_line_number() {
        let doc = "Q1|a|b|1\n\nQ2|c|d|x\nQ3|e|f|1";
        let err = parse_document(doc).unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_empty_document() {
        assert!(parse_document("").unwrap().is_empty());
    }
}
