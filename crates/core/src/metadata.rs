//! Cascading field extraction for course fact sheets.
//!
//! Every field is resolved by an ordered list of strategies. The first
//! strategy that yields a value wins; later ones only run when earlier ones
//! miss. Extraction never fails: a field nobody recognises is left absent or
//! set to its documented default.

use crate::models::{CourseMetadata, Examination, GradeType, UNKNOWN_LECTURER};
use crate::normalize::normalize;
use chrono::{Datelike, Local};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

type Strategy<'a, T> = (&'static str, &'a dyn Fn(&str) -> Option<T>);

/// Runs `strategies` in order and returns the first hit.
fn cascade<T>(field: &str, text: &str, strategies: &[Strategy<'_, T>]) -> Option<T> {
    strategies.iter().find_map(|(name, strategy)| {
        let value = strategy(text);
        if value.is_some() {
            debug!(field, strategy = *name, "metadata strategy matched");
        }
        value
    })
}

fn lazy_regex(pattern: &'static str) -> Regex {
    Regex::new(pattern).expect("static metadata regex is valid")
}

static TITLE_PRIMARY: LazyLock<Regex> =
    LazyLock::new(|| lazy_regex(r"(\d{1,3},\d{1,3}):\s*([^\n]+)"));
static TITLE_UNTIL_ECTS: LazyLock<Regex> =
    LazyLock::new(|| lazy_regex(r"(?s)(\d+,\d+)[:\s]+(.+?)(?:ECTS|\z)"));

static ECTS_CREDITS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| lazy_regex(r"(?i)ECTS\s*credits:?\s*(\d+)"));
static ECTS_HYPHEN_LABEL: LazyLock<Regex> =
    LazyLock::new(|| lazy_regex(r"(?i)ECTS-Credits:?\s*(\d+)"));
static ECTS_LABEL: LazyLock<Regex> = LazyLock::new(|| lazy_regex(r"(?i)ECTS:?\s*(\d+)"));
static ECTS_SUFFIX: LazyLock<Regex> = LazyLock::new(|| lazy_regex(r"(?i)(\d+)\s*ECTS"));
static ECTS_SEPARATED: LazyLock<Regex> = LazyLock::new(|| lazy_regex(r"(?i)ECTS[\s:-]+(\d+)"));
static ECTS_PROXIMITY: LazyLock<Regex> =
    LazyLock::new(|| lazy_regex(r"(?i)ECTS[^0-9]{0,30}(\d+)"));

static LECTURE_LINE_SPACED: LazyLock<Regex> = LazyLock::new(|| {
    lazy_regex(r"(\d{1,3},\d{1,3},\d{1,2}(?:\.00)?)[^-]+ -- ([^-]+) -- ([^-\n]+)")
});
static LECTURE_LINE_TIGHT: LazyLock<Regex> = LazyLock::new(|| {
    lazy_regex(r"(\d{1,3},\d{1,3},\d{1,2}(?:\.00)?)[^-]+--([^-]+)--([^-\n]+)")
});
static LECTURE_LINE_LOOSE: LazyLock<Regex> = LazyLock::new(|| {
    lazy_regex(r"(\d{1,3},\d{1,3}(?:,\d{1,2}(?:\.00)?)?)[^-]*--([^-]*)--([^-\n]*)")
});
static LECTURER_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    lazy_regex(r"(?i)(?:Dozent(?:en)?|Lecturers?)(?:[ \t]*:[ \t]*|[ \t]+)([^\n\r]+)")
});
static GERMAN_VOTE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    lazy_regex(r"(?i)\b(?:und|der|die|das|mit|für|prüfung|vorlesung)\b")
});
static ENGLISH_VOTE_WORDS: LazyLock<Regex> =
    LazyLock::new(|| lazy_regex(r"(?i)\b(?:and|the|with|for|exam|lecture)\b"));

static EXAM_ENGLISH: LazyLock<Regex> = LazyLock::new(|| {
    lazy_regex(
        r"(?i)decentral\s*-\s*([^,]+),\s*([^,]+),\s*([^(]+)\s+(individual|group)\s+grade\s*\((\d+%)\)",
    )
});
static EXAM_GERMAN: LazyLock<Regex> = LazyLock::new(|| {
    lazy_regex(
        r"(?i)dezentral\s*-\s*([^,]+),\s*([^,]+),\s*([^(]+)\s+(individual|gruppen)note\s*\((\d+%)\)",
    )
});
static EXAM_NO_SPACE: LazyLock<Regex> = LazyLock::new(|| {
    lazy_regex(
        r"(?i)(?:decentral|dezentral)-([^,]+),([^,]+),([^(]+)(individual|group|gruppen)(?:note|grade)\((\d+%)\)",
    )
});
static EXAM_PERCENT: LazyLock<Regex> = LazyLock::new(|| lazy_regex(r"\((\d+%)\)"));
static EXAM_TYPE: LazyLock<Regex> =
    LazyLock::new(|| lazy_regex(r"(?i)(?:decentral|dezentral)\s*-\s*([^,]+)"));
static EXAM_MODE: LazyLock<Regex> =
    LazyLock::new(|| lazy_regex(r"(?i)(?:decentral|dezentral)\s*-\s*[^,]+,\s*([^,]+)"));

static SEMESTER_VALID_FOR: LazyLock<Regex> = LazyLock::new(|| {
    lazy_regex(
        r"(?is)(?:valid for|version:|gültig für|Version).*?(Spring|Fall|Autumn|Frühjahrssemester|Herbstsemester)\s+(?:Semester\s+)?(\d{4})",
    )
});
static SEMESTER_GERMAN: LazyLock<Regex> =
    LazyLock::new(|| lazy_regex(r"(?i)(Frühjahrssemester|Herbstsemester)\s*(\d{4})"));
static SEMESTER_GENERIC: LazyLock<Regex> =
    LazyLock::new(|| lazy_regex(r"(?i)(?:Semester|Term)[\s:]*([A-Za-z]+)[\s-]*(\d{4})"));
static SEMESTER_YEAR_ONLY: LazyLock<Regex> =
    LazyLock::new(|| lazy_regex(r"(?i)(?:semester|term|jahr)[^0-9]{0,30}(\d{4})"));

const EXAM_LINE_KEYWORDS: [&str; 7] = [
    "decentral",
    "dezentral",
    "prüfung",
    "exam",
    "test",
    "note",
    "grade",
];
const UNKNOWN_EXAM_FIELD: &str = "Unknown";

/// Extracts course metadata from normalized fact sheet text, using the
/// current month for the year-only semester fallback.
pub fn extract_metadata(text: &str, source_name: &str) -> CourseMetadata {
    extract_metadata_at(text, source_name, Local::now().month())
}

/// Like [`extract_metadata`] with an explicit calendar month (1-12).
pub fn extract_metadata_at(text: &str, source_name: &str, month: u32) -> CourseMetadata {
    let identifier = extract_identifier(text);
    let (course_number, title) = match identifier {
        Some((number, title)) => (Some(number), Some(title)),
        None => (None, None),
    };

    let lecture = extract_language_and_lecturers(text, course_number.as_deref());

    CourseMetadata {
        source: source_name.to_string(),
        course_number,
        title,
        ects: extract_ects(text),
        language: lecture.language,
        lecturers: lecture.lecturers,
        semester: extract_semester(text, month),
        examinations: extract_examinations(text),
        ..CourseMetadata::default()
    }
}

pub fn extract_identifier(text: &str) -> Option<(String, String)> {
    fn with_pattern(pattern: &Regex, text: &str) -> Option<(String, String)> {
        let captures = pattern.captures(text)?;
        let number = captures.get(1)?.as_str().to_string();
        let title = normalize(captures.get(2)?.as_str()).trim().to_string();
        if title.is_empty() {
            return None;
        }
        Some((number, title))
    }

    let strategies: [Strategy<'_, (String, String)>; 2] = [
        ("number-colon-line", &|t: &str| with_pattern(&TITLE_PRIMARY, t)),
        ("number-until-ects", &|t: &str| with_pattern(&TITLE_UNTIL_ECTS, t)),
    ];
    cascade("identifier", text, &strategies)
}

pub fn extract_ects(text: &str) -> Option<u32> {
    fn with_pattern(pattern: &Regex, text: &str) -> Option<u32> {
        let value = pattern.captures(text)?.get(1)?.as_str().parse::<u32>().ok()?;
        (value > 0).then_some(value)
    }

    let strategies: [Strategy<'_, u32>; 6] = [
        ("ects-credits-label", &|t: &str| with_pattern(&ECTS_CREDITS_LABEL, t)),
        ("ects-hyphen-credits", &|t: &str| with_pattern(&ECTS_HYPHEN_LABEL, t)),
        ("ects-label", &|t: &str| with_pattern(&ECTS_LABEL, t)),
        ("number-ects", &|t: &str| with_pattern(&ECTS_SUFFIX, t)),
        ("ects-separator", &|t: &str| with_pattern(&ECTS_SEPARATED, t)),
        ("ects-proximity", &|t: &str| with_pattern(&ECTS_PROXIMITY, t)),
    ];
    cascade("ects", text, &strategies)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LectureInfo {
    pub language: String,
    pub lecturers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct LectureLine {
    language: Option<String>,
    lecturers: Vec<String>,
}

impl LectureLine {
    fn from_parts(language: &str, lecturers: &str) -> Self {
        let language = language.trim();
        Self {
            language: (!language.is_empty()).then(|| language.to_string()),
            lecturers: split_names(lecturers),
        }
    }
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|name| normalize(name.trim()))
        .filter(|name| !name.is_empty())
        .collect()
}

/// Resolves the teaching language and lecturer list. Language always ends up
/// set (keyword vote as last resort) and lecturers are never empty.
pub fn extract_language_and_lecturers(text: &str, course_number: Option<&str>) -> LectureInfo {
    fn with_pattern(pattern: &Regex, text: &str) -> Option<LectureLine> {
        let captures = pattern.captures(text)?;
        Some(LectureLine::from_parts(
            captures.get(2).map_or("", |m| m.as_str()),
            captures.get(3).map_or("", |m| m.as_str()),
        ))
    }

    let free_text = |t: &str| scan_lecture_lines(t, course_number);
    let strategies: [Strategy<'_, LectureLine>; 4] = [
        ("timetable-spaced", &|t: &str| with_pattern(&LECTURE_LINE_SPACED, t)),
        ("timetable-tight", &|t: &str| with_pattern(&LECTURE_LINE_TIGHT, t)),
        ("timetable-loose", &|t: &str| with_pattern(&LECTURE_LINE_LOOSE, t)),
        ("free-text-scan", &free_text),
    ];
    let line = cascade("lecture-line", text, &strategies);

    let (line_language, mut lecturers) = match line {
        Some(line) => (line.language, line.lecturers),
        None => (None, explicit_lecturers(text)),
    };

    let language = line_language
        .or_else(|| explicit_language(text))
        .unwrap_or_else(|| vote_language(text).to_string());

    if lecturers.is_empty() {
        lecturers.push(UNKNOWN_LECTURER.to_string());
    }

    LectureInfo {
        language,
        lecturers,
    }
}

fn scan_lecture_lines(text: &str, course_number: Option<&str>) -> Option<LectureLine> {
    let course_prefix = course_number
        .and_then(|number| number.split(',').next())
        .filter(|prefix| !prefix.is_empty());

    text.lines()
        .filter(|line| line.contains("--"))
        .filter(|line| {
            let lowered = line.to_lowercase();
            lowered.contains("english")
                || lowered.contains("deutsch")
                || lowered.contains("german")
                || course_prefix.is_some_and(|prefix| line.contains(prefix))
        })
        .find_map(|line| {
            let parts: Vec<&str> = line.split("--").collect();
            if parts.len() >= 3 {
                Some(LectureLine::from_parts(parts[1], parts[2]))
            } else {
                None
            }
        })
}

fn explicit_language(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    if lowered.contains("sprache: deutsch") || lowered.contains("language: german") {
        Some("Deutsch".to_string())
    } else if lowered.contains("sprache: englisch") || lowered.contains("language: english") {
        Some("English".to_string())
    } else {
        None
    }
}

fn explicit_lecturers(text: &str) -> Vec<String> {
    LECTURER_LABEL
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|names| split_names(names.as_str()))
        .unwrap_or_default()
}

/// German/English keyword-frequency vote. Ties go to English.
pub fn vote_language(text: &str) -> &'static str {
    let german = GERMAN_VOTE_WORDS.find_iter(text).count();
    let english = ENGLISH_VOTE_WORDS.find_iter(text).count();
    if german > english {
        "Deutsch"
    } else {
        "English"
    }
}

pub fn extract_examinations(text: &str) -> Vec<Examination> {
    fn with_pattern(pattern: &Regex, text: &str) -> Option<Vec<Examination>> {
        let exams: Vec<Examination> = pattern
            .captures_iter(text)
            .map(|captures| {
                let field = |index: usize| {
                    normalize(captures.get(index).map_or("", |m| m.as_str()).trim())
                };
                Examination {
                    exam_type: field(1),
                    mode: field(2),
                    format: field(3),
                    grade_type: grade_type_of(&field(4)),
                    weighting: field(5),
                }
            })
            .collect();
        (!exams.is_empty()).then_some(exams)
    }

    let strategies: [Strategy<'_, Vec<Examination>>; 4] = [
        ("english-labelled", &|t: &str| with_pattern(&EXAM_ENGLISH, t)),
        ("german-labelled", &|t: &str| with_pattern(&EXAM_GERMAN, t)),
        ("no-space", &|t: &str| with_pattern(&EXAM_NO_SPACE, t)),
        ("keyword-lines", &parse_exam_lines),
    ];
    cascade("examinations", text, &strategies).unwrap_or_default()
}

fn grade_type_of(label: &str) -> GradeType {
    let lowered = label.to_lowercase();
    if lowered.contains("group") || lowered.contains("gruppen") {
        GradeType::Group
    } else {
        GradeType::Individual
    }
}

fn parse_exam_lines(text: &str) -> Option<Vec<Examination>> {
    let exams: Vec<Examination> = text
        .lines()
        .filter(|line| {
            let lowered = line.to_lowercase();
            EXAM_LINE_KEYWORDS
                .iter()
                .any(|keyword| lowered.contains(keyword))
                && (line.contains('%') || line.contains("pass"))
        })
        .filter_map(|line| {
            let weighting = EXAM_PERCENT.captures(line)?.get(1)?.as_str().to_string();
            let capture_or = |pattern: &Regex, fallback: &str| {
                pattern
                    .captures(line)
                    .and_then(|captures| captures.get(1))
                    .map(|m| normalize(m.as_str().trim()))
                    .unwrap_or_else(|| fallback.to_string())
            };

            Some(Examination {
                exam_type: capture_or(&EXAM_TYPE, "Exam"),
                mode: capture_or(&EXAM_MODE, UNKNOWN_EXAM_FIELD),
                format: UNKNOWN_EXAM_FIELD.to_string(),
                grade_type: grade_type_of(line),
                weighting,
            })
        })
        .collect();

    (!exams.is_empty()).then_some(exams)
}

/// Maps English and German term names onto `Spring`/`Fall`.
fn canonical_term(name: &str) -> Option<&'static str> {
    let lowered = name.to_lowercase();
    if lowered.starts_with("spring") || lowered.contains("frühjahr") || lowered.contains("frühling")
    {
        Some("Spring")
    } else if lowered.starts_with("fall")
        || lowered.starts_with("autumn")
        || lowered.contains("herbst")
    {
        Some("Fall")
    } else {
        None
    }
}

pub fn extract_semester(text: &str, month: u32) -> Option<String> {
    fn with_pattern(pattern: &Regex, text: &str) -> Option<String> {
        pattern.captures_iter(text).find_map(|captures| {
            let term = canonical_term(captures.get(1)?.as_str())?;
            Some(format!("{term} {}", captures.get(2)?.as_str()))
        })
    }

    let year_only = |t: &str| -> Option<String> {
        let year = SEMESTER_YEAR_ONLY.captures(t)?.get(1)?.as_str().to_string();
        let term = if (2..=8).contains(&month) {
            "Spring"
        } else {
            "Fall"
        };
        Some(format!("{term} {year}"))
    };

    let strategies: [Strategy<'_, String>; 4] = [
        ("valid-for-phrase", &|t: &str| with_pattern(&SEMESTER_VALID_FOR, t)),
        ("german-term", &|t: &str| with_pattern(&SEMESTER_GERMAN, t)),
        ("semester-term-phrase", &|t: &str| with_pattern(&SEMESTER_GENERIC, t)),
        ("year-near-keyword", &year_only),
    ];
    cascade("semester", text, &strategies)
}
