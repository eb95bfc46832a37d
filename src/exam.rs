use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use serde::Deserialize;

use crate::error::PortalError;

/// Assessment categories, in the order they are sat. The lowercase wire
/// names match the question paper and the result store columns.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    English,
    Logical,
    ComputerSkill,
    CustomerService,
    Typing,
}

impl Category {
    pub const ORDER: [Category; 5] = [
        Category::English,
        Category::Logical,
        Category::ComputerSkill,
        Category::CustomerService,
        Category::Typing,
    ];

    /// Heading shown above a section.
    pub fn label(&self) -> &'static str {
        match self {
            Category::English => "English",
            Category::Logical => "Logical",
            Category::ComputerSkill => "Computer Skill",
            Category::CustomerService => "Customer Service",
            Category::Typing => "Typing Test",
        }
    }
}

/// One multiple-choice question as issued by the bank. `answer` is the
/// index of the correct option; only submission scoring reads it.
#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(rename = "correct_answer")]
    pub answer: usize,
    pub category: Category,
}

#[derive(Debug, Clone)]
pub enum SectionContent {
    Questions(Vec<Question>),
    Typing { reference: String },
}

#[derive(Debug, Clone)]
pub struct Section {
    pub category: Category,
    pub budget_secs: f64,
    pub content: SectionContent,
}

impl Section {
    pub fn is_typing(&self) -> bool {
        matches!(self.content, SectionContent::Typing { .. })
    }

    pub fn questions(&self) -> &[Question] {
        match &self.content {
            SectionContent::Questions(questions) => questions,
            SectionContent::Typing { .. } => &[],
        }
    }
}

/// The fixed, ordered run of sections for one sitting: every question
/// category in canonical order, then the typing test. Built once when the
/// paper loads; the typing reference is generated here and reused for the
/// whole session.
#[derive(Debug, Clone)]
pub struct ExamPlan {
    sections: Vec<Section>,
}

impl ExamPlan {
    /// Group the paper by category and append the typing section. A paper
    /// without a single question is refused; a category with none still
    /// gets its (empty) section.
    pub fn build(
        questions: Vec<Question>,
        reference: String,
        section_secs: f64,
        typing_secs: f64,
    ) -> Result<Self, PortalError> {
        let paper: Vec<Question> = questions
            .into_iter()
            .filter(|q| q.category != Category::Typing)
            .collect();

        if paper.is_empty() {
            return Err(PortalError::ContentLoad("paper contains no questions".into()));
        }

        let mut grouped: HashMap<Category, Vec<Question>> =
            paper.into_iter().map(|q| (q.category, q)).into_group_map();

        let mut sections: Vec<Section> = Category::ORDER
            .iter()
            .filter(|c| **c != Category::Typing)
            .map(|c| Section {
                category: *c,
                budget_secs: section_secs,
                content: SectionContent::Questions(grouped.remove(c).unwrap_or_default()),
            })
            .collect();

        sections.push(Section {
            category: Category::Typing,
            budget_secs: typing_secs,
            content: SectionContent::Typing { reference },
        });

        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, idx: usize) -> &Section {
        &self.sections[idx]
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.sections.len() - 1
    }

    pub fn typing_reference(&self) -> &str {
        match &self.sections[self.last_index()].content {
            SectionContent::Typing { reference } => reference,
            SectionContent::Questions(_) => "",
        }
    }
}

/// Latest selected option per question id. Absent means unanswered.
pub type AnswerMap = HashMap<String, usize>;

/// Count of correct answers per question category. Every category starts
/// at zero, so empty and unanswered sections simply score zero; there is
/// no partial credit.
pub fn score_categories(plan: &ExamPlan, answers: &AnswerMap) -> BTreeMap<Category, u32> {
    let mut scores: BTreeMap<Category, u32> = Category::ORDER
        .iter()
        .filter(|c| **c != Category::Typing)
        .map(|c| (*c, 0))
        .collect();

    for section in plan.sections() {
        for q in section.questions() {
            if answers.get(&q.id) == Some(&q.answer) {
                if let Some(score) = scores.get_mut(&q.category) {
                    *score += 1;
                }
            }
        }
    }

    scores
}

/// Submission payload, one value per result column.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ExamOutcome {
    pub examination_id: String,
    pub english: u32,
    pub logical: u32,
    pub computerskill: u32,
    pub customerservice: u32,
    pub typing_wpm: u32,
    pub typing_accuracy: u32,
}

impl ExamOutcome {
    pub fn total_score(&self) -> u32 {
        self.english + self.logical + self.computerskill + self.customerservice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, category: Category, answer: usize) -> Question {
        Question {
            id: id.to_string(),
            prompt: format!("prompt {id}"),
            options: vec![
                "option a".into(),
                "option b".into(),
                "option c".into(),
                "option d".into(),
            ],
            answer,
            category,
        }
    }

    fn plan_with(questions: Vec<Question>) -> ExamPlan {
        ExamPlan::build(questions, "go now.".into(), 300.0, 30.0).unwrap()
    }

    #[test]
    fn test_category_wire_names() {
        let parsed: Category = serde_json::from_str("\"computerskill\"").unwrap();
        assert_eq!(parsed, Category::ComputerSkill);
        let parsed: Category = serde_json::from_str("\"customerservice\"").unwrap();
        assert_eq!(parsed, Category::CustomerService);

        assert_eq!(Category::English.to_string(), "english");
        assert_eq!(Category::ComputerSkill.to_string(), "computerskill");
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(Category::ComputerSkill.label(), "Computer Skill");
        assert_eq!(Category::Typing.label(), "Typing Test");
    }

    #[test]
    fn test_question_deserialization_uses_paper_field_names() {
        let q: Question = serde_json::from_str(
            r#"{
                "id": "q1",
                "question": "Pick the synonym of rapid",
                "options": ["slow", "fast", "late", "dull"],
                "correct_answer": 1,
                "category": "english"
            }"#,
        )
        .unwrap();

        assert_eq!(q.prompt, "Pick the synonym of rapid");
        assert_eq!(q.answer, 1);
        assert_eq!(q.category, Category::English);
    }

    #[test]
    fn test_plan_orders_sections_and_ends_with_typing() {
        let plan = plan_with(vec![
            question("c1", Category::ComputerSkill, 0),
            question("e1", Category::English, 0),
        ]);

        let order: Vec<Category> = plan.sections().iter().map(|s| s.category).collect();
        assert_eq!(order, Category::ORDER.to_vec());
        assert!(plan.section(plan.last_index()).is_typing());
        assert_eq!(plan.typing_reference(), "go now.");
    }

    #[test]
    fn test_plan_keeps_question_order_within_category() {
        let plan = plan_with(vec![
            question("e1", Category::English, 0),
            question("l1", Category::Logical, 0),
            question("e2", Category::English, 1),
        ]);

        let ids: Vec<&str> = plan.section(0).questions().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e2"]);
    }

    #[test]
    fn test_plan_tolerates_empty_categories() {
        let plan = plan_with(vec![question("e1", Category::English, 0)]);

        assert_eq!(plan.section(1).questions().len(), 0);
        assert_eq!(plan.section(2).questions().len(), 0);
        assert_eq!(plan.len(), 5);
    }

    #[test]
    fn test_plan_refuses_empty_paper() {
        let err = ExamPlan::build(vec![], "ref".into(), 300.0, 30.0).unwrap_err();
        assert!(err.to_string().contains("failed to load questions"));
    }

    #[test]
    fn test_plan_budgets() {
        let plan = plan_with(vec![question("e1", Category::English, 0)]);
        assert_eq!(plan.section(0).budget_secs, 300.0);
        assert_eq!(plan.section(plan.last_index()).budget_secs, 30.0);
    }

    #[test]
    fn test_scoring_counts_only_exact_matches() {
        let plan = plan_with(vec![
            question("e1", Category::English, 0),
            question("e2", Category::English, 1),
            question("l1", Category::Logical, 2),
        ]);

        let mut answers = AnswerMap::new();
        answers.insert("e1".into(), 0); // correct
        answers.insert("e2".into(), 3); // wrong
                                        // l1 unanswered

        let scores = score_categories(&plan, &answers);
        assert_eq!(scores[&Category::English], 1);
        assert_eq!(scores[&Category::Logical], 0);
        assert_eq!(scores[&Category::ComputerSkill], 0);
        assert_eq!(scores[&Category::CustomerService], 0);
        assert!(!scores.contains_key(&Category::Typing));
    }

    #[test]
    fn test_outcome_total() {
        let outcome = ExamOutcome {
            examination_id: "EX-1".into(),
            english: 3,
            logical: 4,
            computerskill: 2,
            customerservice: 5,
            typing_wpm: 41,
            typing_accuracy: 96,
        };
        assert_eq!(outcome.total_score(), 14);
    }

    #[test]
    fn test_outcome_serializes_with_store_field_names() {
        let outcome = ExamOutcome {
            examination_id: "EX-1".into(),
            english: 1,
            logical: 0,
            computerskill: 0,
            customerservice: 0,
            typing_wpm: 40,
            typing_accuracy: 100,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["examination_id"], "EX-1");
        assert_eq!(json["typing_wpm"], 40);
        assert_eq!(json["customerservice"], 0);
    }
}
