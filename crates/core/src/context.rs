//! Renders retrieved records into the context block handed to generation.

use crate::models::{CourseMetadata, Metadata, QueryClassification, QueryLanguage, Record};
use serde::{Deserialize, Serialize};

const BLOCK_SEPARATOR: &str = "\n\n";
const GERMAN_ANSWER_INSTRUCTION: &str =
    "WICHTIG: Antworte auf Deutsch, wenn die Frage auf Deutsch gestellt wurde.";

pub fn format_context(records: &[Record]) -> String {
    records
        .iter()
        .map(format_record)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

pub fn format_record(record: &Record) -> String {
    match &record.metadata {
        Metadata::Chunk(course) | Metadata::Full(course) => format_course(course, &record.text),
        Metadata::Faq(_) | Metadata::Thesis(_) => record.text.clone(),
    }
}

fn format_course(course: &CourseMetadata, body: &str) -> String {
    let mut block = course_heading(course);

    let details: Vec<String> = [
        non_empty(&course.language).map(|language| format!("Language: {language}")),
        (!course.lecturers.is_empty())
            .then(|| format!("Lecturers: {}", course.lecturers.join(", "))),
        course
            .semester
            .as_deref()
            .and_then(non_empty)
            .map(|semester| format!("Semester: {semester}")),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !details.is_empty() {
        block.push('\n');
        block.push_str(&details.join(" | "));
    }

    if !course.examinations.is_empty() {
        block.push_str("\nExaminations:");
        for exam in &course.examinations {
            block.push_str(&format!(
                "\n- {} ({}): {}, {}",
                exam.exam_type,
                exam.weighting,
                exam.format,
                exam.grade_type.as_str()
            ));
        }
    }

    block.push_str(BLOCK_SEPARATOR);
    block.push_str(body);
    block
}

/// `PROGRAM | 8,126: Title (6 ECTS)`, leaving out whatever is unknown. The
/// title falls back to the source document name.
fn course_heading(course: &CourseMetadata) -> String {
    let mut heading = String::new();
    if let Some(program) = course.program.as_deref().and_then(non_empty) {
        heading.push_str(&program.to_uppercase());
        heading.push_str(" | ");
    }
    if let Some(number) = course.course_number.as_deref().and_then(non_empty) {
        heading.push_str(number);
        heading.push_str(": ");
    }
    heading.push_str(
        course
            .title
            .as_deref()
            .and_then(non_empty)
            .unwrap_or(&course.source),
    );
    if let Some(ects) = course.ects {
        heading.push_str(&format!(" ({ects} ECTS)"));
    }
    heading
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Builds the message list for the generation backend: one system message
/// carrying the context block, then prior turns, then the user's query.
pub fn assemble_prompt(
    preamble: &str,
    context: &str,
    history: &[ChatMessage],
    query: &str,
    classification: &QueryClassification,
) -> Vec<ChatMessage> {
    let mut system = String::new();
    if !preamble.trim().is_empty() {
        system.push_str(preamble.trim_end());
        system.push_str("\n\n");
    }
    system.push_str(&format!("CONTEXT:\n{context}\n\nQUESTION: {query}"));
    if classification.language == QueryLanguage::De {
        system.push_str("\n\n");
        system.push_str(GERMAN_ANSWER_INSTRUCTION);
    }

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new(Role::System, system));
    messages.extend(
        history
            .iter()
            .filter(|message| message.role != Role::System)
            .cloned(),
    );
    messages.push(ChatMessage::new(Role::User, query));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Examination, FaqMetadata, GradeType, ThesisMetadata};

    fn course_record(metadata: CourseMetadata) -> Record {
        Record {
            id: "c".to_string(),
            vector: Vec::new(),
            text: "Course body text.".to_string(),
            metadata: Metadata::Chunk(metadata),
        }
    }

    #[test]
    fn course_header_lists_known_fields() {
        let record = course_record(CourseMetadata {
            source: "auditing.pdf".to_string(),
            program: Some("macfin".to_string()),
            course_number: Some("8,126".to_string()),
            title: Some("Advanced Auditing".to_string()),
            ects: Some(6),
            language: "English".to_string(),
            lecturers: vec!["Meister Nicole".to_string(), "Schmidt Peter".to_string()],
            semester: Some("Fall 2024".to_string()),
            examinations: vec![Examination {
                exam_type: "Central".to_string(),
                mode: "Written".to_string(),
                format: "Written exam".to_string(),
                grade_type: GradeType::Individual,
                weighting: "60%".to_string(),
            }],
            ..CourseMetadata::default()
        });

        assert_eq!(
            format_record(&record),
            "MACFIN | 8,126: Advanced Auditing (6 ECTS)\n\
             Language: English | Lecturers: Meister Nicole, Schmidt Peter | Semester: Fall 2024\n\
             Examinations:\n\
             - Central (60%): Written exam, individual grade\n\n\
             Course body text."
        );
    }

    #[test]
    fn absent_fields_are_omitted() {
        let record = course_record(CourseMetadata {
            source: "unnamed.pdf".to_string(),
            ..CourseMetadata::default()
        });
        let rendered = format_record(&record);
        assert_eq!(rendered, "unnamed.pdf\n\nCourse body text.");
        assert!(!rendered.contains("undefined"));
        assert!(!rendered.contains("ECTS"));
    }

    #[test]
    fn faq_and_thesis_records_render_raw_text() {
        let faq = Record {
            id: "f".to_string(),
            vector: Vec::new(),
            text: "FRAGE: Wann?\nANTWORT: Morgen.".to_string(),
            metadata: Metadata::Faq(FaqMetadata {
                source: "faq.csv".to_string(),
                kategorie: String::new(),
                titel: String::new(),
                frage: "Wann?".to_string(),
                antwort: "Morgen.".to_string(),
                datum: String::new(),
                name_antwortgeber: String::new(),
                language_hint: QueryLanguage::De,
                chunk_id: "x".to_string(),
            }),
        };
        let thesis = Record {
            id: "t".to_string(),
            vector: Vec::new(),
            text: "Title: Data\nStudent: A\nYear: 2023\nSupervisor: B".to_string(),
            metadata: Metadata::Thesis(ThesisMetadata {
                source: "theses.csv".to_string(),
                title_thesis: "Data".to_string(),
                student: "A".to_string(),
                year: "2023".to_string(),
                supervisor: "B".to_string(),
            }),
        };

        assert_eq!(
            format_context(&[faq.clone(), thesis.clone()]),
            format!("{}\n\n{}", faq.text, thesis.text)
        );
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn prompt_wraps_context_and_history() {
        let history = vec![
            ChatMessage::new(Role::User, "Hallo"),
            ChatMessage::new(Role::Assistant, "Hallo! Wie kann ich helfen?"),
        ];
        let classification = QueryClassification {
            language: QueryLanguage::De,
            ..QueryClassification::default()
        };

        let messages = assemble_prompt(
            "You are a study assistant.",
            "ctx",
            &history,
            "Wann ist die Frist?",
            &classification,
        );

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        let expected_head = "You are a study assistant.\n\nCONTEXT:\nctx\n\n\
            QUESTION: Wann ist die Frist?";
        assert!(messages[0].content.starts_with(expected_head));
        assert!(messages[0].content.ends_with(GERMAN_ANSWER_INSTRUCTION));
        assert_eq!(messages[1..3], history[..]);
        assert_eq!(messages[3], ChatMessage::new(Role::User, "Wann ist die Frist?"));
    }

    #[test]
    fn english_prompt_has_no_german_instruction() {
        let messages = assemble_prompt("", "ctx", &[], "When?", &QueryClassification::default());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "CONTEXT:\nctx\n\nQUESTION: When?");
    }
}
