//! Batch/roster index derived from trainer and student records.
//!
//! Batches are not stored anywhere; they exist only as label strings on
//! trainer and student records. Everything that needs "the list of batches"
//! goes through this module so there is one derivation instead of one per
//! view.

use crate::model::{Student, Trainer};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub label: String,
    pub trainer_ids: Vec<String>,
    pub student_ids: Vec<String>,
    pub subjects: Vec<String>,
    /// False when only students carry this label; such students have a
    /// stream nobody posts to.
    pub has_trainer: bool,
}

/// Trim and de-duplicate labels, keeping first-seen order.
pub fn normalize_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        let t = label.as_ref().trim();
        if t.is_empty() || out.iter().any(|l| l == t) {
            continue;
        }
        out.push(t.to_string());
    }
    out
}

/// Returns false when the trimmed label is blank or already present.
pub fn add_label(labels: &mut Vec<String>, label: &str) -> bool {
    let t = label.trim();
    if t.is_empty() || labels.iter().any(|l| l == t) {
        return false;
    }
    labels.push(t.to_string());
    true
}

/// Removes the first exact occurrence only.
pub fn remove_label(labels: &mut Vec<String>, label: &str) -> bool {
    match labels.iter().position(|l| l == label) {
        Some(i) => {
            labels.remove(i);
            true
        }
        None => false,
    }
}

pub fn distinct_labels(trainers: &[Trainer]) -> Vec<String> {
    normalize_labels(trainers.iter().flat_map(|t| t.batches.iter()))
}

pub fn subjects(trainers: &[Trainer]) -> Vec<String> {
    normalize_labels(trainers.iter().map(|t| t.subject.as_str()))
}

pub fn batches_for_subject(trainers: &[Trainer], subject: &str) -> Vec<String> {
    normalize_labels(
        trainers
            .iter()
            .filter(|t| t.subject == subject)
            .flat_map(|t| t.batches.iter()),
    )
}

pub fn batch_index(trainers: &[Trainer], students: &[Student]) -> Vec<BatchSummary> {
    let mut order: Vec<String> = Vec::new();
    let mut by_label: HashMap<String, BatchSummary> = HashMap::new();

    let mut entry = |label: &str| -> Option<String> {
        let t = label.trim();
        if t.is_empty() {
            return None;
        }
        if !by_label.contains_key(t) {
            order.push(t.to_string());
            by_label.insert(
                t.to_string(),
                BatchSummary {
                    label: t.to_string(),
                    trainer_ids: Vec::new(),
                    student_ids: Vec::new(),
                    subjects: Vec::new(),
                    has_trainer: false,
                },
            );
        }
        Some(t.to_string())
    };

    let mut trainer_refs: Vec<(String, &Trainer)> = Vec::new();
    for trainer in trainers {
        for label in &trainer.batches {
            if let Some(key) = entry(label) {
                trainer_refs.push((key, trainer));
            }
        }
    }
    let mut student_refs: Vec<(String, &Student)> = Vec::new();
    for student in students {
        for label in &student.batches {
            if let Some(key) = entry(label) {
                student_refs.push((key, student));
            }
        }
    }

    for (key, trainer) in trainer_refs {
        if let Some(b) = by_label.get_mut(&key) {
            b.has_trainer = true;
            if !b.trainer_ids.contains(&trainer.id) {
                b.trainer_ids.push(trainer.id.clone());
            }
            let subject = trainer.subject.trim();
            if !subject.is_empty() && !b.subjects.iter().any(|s| s == subject) {
                b.subjects.push(subject.to_string());
            }
        }
    }
    for (key, student) in student_refs {
        if let Some(b) = by_label.get_mut(&key) {
            if !b.student_ids.contains(&student.id) {
                b.student_ids.push(student.id.clone());
            }
        }
    }

    order
        .into_iter()
        .filter_map(|label| by_label.remove(&label))
        .collect()
}

/// Labels carried by students that no trainer teaches.
pub fn orphan_labels(trainers: &[Trainer], students: &[Student]) -> BTreeSet<String> {
    batch_index(trainers, students)
        .into_iter()
        .filter(|b| !b.has_trainer)
        .map(|b| b.label)
        .collect()
}

pub fn trainer_matches(trainer: &Trainer, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    trainer.name.to_lowercase().contains(&q)
        || trainer.subject.to_lowercase().contains(&q)
        || trainer.batches.iter().any(|b| b.to_lowercase().contains(&q))
}

pub fn student_matches(student: &Student, query: &str) -> bool {
    let raw = query.trim();
    if raw.is_empty() {
        return true;
    }
    let q = raw.to_lowercase();
    student.name.to_lowercase().contains(&q)
        || student.email.to_lowercase().contains(&q)
        || student.phone.contains(raw)
        || student.student_code.to_lowercase().contains(&q)
        || student.batches.iter().any(|b| b.to_lowercase().contains(&q))
}


#[cfg(test)]
mod tests {
    use super::fixtures::{student, trainer};
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn distinct_labels_lists_each_trainer_label_once() {
        let trainers = vec![
            trainer("t1", "Computer Science", &["SOC1", "SOC2", "SOC3"]),
            trainer("t2", "Data Science", &["SOC2", "SOC4"]),
            trainer("t3", "Web", &["SOC1", " SOC5 "]),
            trainer("t4", "Empty", &[]),
        ];
        let labels = distinct_labels(&trainers);
        assert_eq!(labels, vec!["SOC1", "SOC2", "SOC3", "SOC4", "SOC5"]);

        for t in &trainers {
            for b in &t.batches {
                let n = labels.iter().filter(|l| *l == b.trim()).count();
                assert_eq!(n, 1, "label {b} should appear exactly once");
            }
        }
    }

    #[test]
    fn remove_label_takes_exactly_one_occurrence() {
        let mut labels: Vec<String> = ["SOC1", "SOC1 ", "soc1", "SOC2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(remove_label(&mut labels, "SOC1"));
        assert_eq!(labels, vec!["SOC1 ", "soc1", "SOC2"]);
        assert!(!remove_label(&mut labels, "SOC1"));
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn add_label_trims_and_rejects_duplicates() {
        let mut labels = vec!["SOC1".to_string()];
        assert!(!add_label(&mut labels, "  SOC1 "));
        assert!(!add_label(&mut labels, "   "));
        assert!(add_label(&mut labels, " SOC2"));
        assert_eq!(labels, vec!["SOC1", "SOC2"]);
    }

    #[test]
    fn batch_index_joins_trainers_and_students() {
        let trainers = vec![
            trainer("t1", "Maths", &["B1", "B2"]),
            trainer("t2", "Physics", &["B2"]),
        ];
        let students = vec![
            student("s1", &["B1"]),
            student("s2", &["B2", "B9"]),
        ];
        let index = batch_index(&trainers, &students);
        let labels: Vec<&str> = index.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["B1", "B2", "B9"]);

        let b2 = &index[1];
        assert_eq!(b2.trainer_ids, vec!["t1", "t2"]);
        assert_eq!(b2.student_ids, vec!["s2"]);
        assert_eq!(b2.subjects, vec!["Maths", "Physics"]);

        let b9 = &index[2];
        assert!(!b9.has_trainer);
        assert_eq!(
            orphan_labels(&trainers, &students).into_iter().collect::<Vec<_>>(),
            vec!["B9".to_string()]
        );
    }

    #[test]
    fn subject_filters() {
        let trainers = vec![
            trainer("t1", "Maths", &["B1", "B2"]),
            trainer("t2", "Maths", &["B2", "B3"]),
            trainer("t3", "", &["B4"]),
        ];
        assert_eq!(subjects(&trainers), vec!["Maths"]);
        assert_eq!(batches_for_subject(&trainers, "Maths"), vec!["B1", "B2", "B3"]);
        assert!(batches_for_subject(&trainers, "Art").is_empty());
    }

    #[test]
    fn search_matches_original_fields() {
        let t = trainer("t1", "Data Science", &["SOC4"]);
        assert!(trainer_matches(&t, "data"));
        assert!(trainer_matches(&t, "soc4"));
        assert!(!trainer_matches(&t, "physics"));

        let s = student("ali", &["SOC4"]);
        assert!(student_matches(&s, "ALI@"));
        assert!(student_matches(&s, "1234"));
        assert!(student_matches(&s, "s-ali"));
        assert!(!student_matches(&s, "zzz"));
    }
}
