use crate::db::PersistenceError;
use crate::domain::answers::{toggle_selection, Answer, AnswerInput, GateAnswer};
use crate::domain::models::{NewParticipant, ParticipantId};
use crate::domain::questionnaire::{
    FollowUpKind, Question, QuestionKind, SurveyDocument, GATE_YES,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub const GENERIC_SUBMIT_ERROR: &str = "An unexpected error occurred";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SurveyError {
    #[error("unknown question {0}")]
    UnknownQuestion(String),
    #[error("question {0} is not the current question")]
    NotCurrent(String),
    #[error("question {question} has no option {option}")]
    UnknownOption { question: String, option: String },
    #[error("question {question} has no follow-up field {field}")]
    UnknownField { question: String, field: String },
    #[error("{question} ({kind}) does not accept this kind of answer")]
    WrongInput { question: String, kind: &'static str },
    #[error("{target} accepts at most {max} characters")]
    TooLong { target: String, max: usize },
    #[error("follow-up fields of {0} are only available after opting in")]
    GateClosed(String),
    #[error("question {0} is not answered yet")]
    Incomplete(String),
    #[error("submission already in progress")]
    SubmissionInFlight,
    #[error("survey already submitted")]
    AlreadySubmitted,
}

/// What `advance` asks the caller to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved on to the question at this index.
    Next(usize),
    /// Last question answered: insert this record, then report back through
    /// [`SurveyEngine::finish_submission`].
    Submit(NewParticipant),
}

pub struct SurveyEngine {
    document: Arc<SurveyDocument>,
    index: usize,
    answers: HashMap<String, Answer>,
    loading: bool,
    last_error: Option<String>,
    participant: Option<ParticipantId>,
}

impl SurveyEngine {
    pub fn new(document: Arc<SurveyDocument>) -> Self {
        Self {
            document,
            index: 0,
            answers: HashMap::new(),
            loading: false,
            last_error: None,
            participant: None,
        }
    }

    pub fn document(&self) -> &SurveyDocument {
        &self.document
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.document.questions.len()
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.total()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn current(&self) -> &Question {
        &self.document.questions[self.index]
    }

    pub fn answer(&self, question_id: &str) -> Option<&Answer> {
        self.answers.get(question_id)
    }

    pub fn record_answer(&mut self, question_id: &str, input: AnswerInput) -> Result<(), SurveyError> {
        if self.participant.is_some() {
            return Err(SurveyError::AlreadySubmitted);
        }
        if self.loading {
            return Err(SurveyError::SubmissionInFlight);
        }
        let document = Arc::clone(&self.document);
        let question = document
            .question(question_id)
            .ok_or_else(|| SurveyError::UnknownQuestion(question_id.to_string()))?;
        if question.id != self.current().id {
            return Err(SurveyError::NotCurrent(question_id.to_string()));
        }

        let next = apply_input(question, self.answers.get(question_id), input)?;
        self.answers.insert(question.id.clone(), next);
        Ok(())
    }

    /// Whether `question`'s required constraint is satisfied.
    pub fn is_complete(&self, question: &Question) -> bool {
        if !question.required {
            return true;
        }
        let answer = self.answers.get(&question.id);
        match &question.kind {
            QuestionKind::MultiSelect { .. } | QuestionKind::RankTopN { .. } => {
                matches!(answer, Some(Answer::Selection(sel)) if !sel.is_empty())
            }
            QuestionKind::ShortTextOneWord { .. } => {
                matches!(answer, Some(Answer::Text(text)) if !text.trim().is_empty())
            }
            QuestionKind::GateOptIn { follow_ups_if_yes, .. } => {
                let Some(Answer::Gate(gate)) = answer else {
                    return false;
                };
                match gate.join.as_deref() {
                    None => false,
                    Some(GATE_YES) => follow_ups_if_yes
                        .iter()
                        .all(|fu| !fu.required || !gate.field(&fu.id).trim().is_empty()),
                    Some(_) => true,
                }
            }
            QuestionKind::SingleSelect { .. } | QuestionKind::ImageSelect { .. } => {
                answer.map(|a| !a.is_empty()).unwrap_or(false)
            }
        }
    }

    pub fn current_complete(&self) -> bool {
        self.is_complete(self.current())
    }

    /// Sole forward navigation. On the last question this starts the
    /// submission and raises the loading flag; a second call while the
    /// insert is in flight is rejected so at most one insert happens.
    pub fn advance(&mut self) -> Result<Advance, SurveyError> {
        if self.participant.is_some() {
            return Err(SurveyError::AlreadySubmitted);
        }
        if self.loading {
            return Err(SurveyError::SubmissionInFlight);
        }
        if !self.current_complete() {
            return Err(SurveyError::Incomplete(self.current().id.clone()));
        }
        if !self.is_last() {
            self.index += 1;
            return Ok(Advance::Next(self.index));
        }

        self.loading = true;
        self.last_error = None;
        Ok(Advance::Submit(self.build_submission()))
    }

    /// Completes a submission started by [`advance`](Self::advance).
    /// Failures keep the engine on the last question with a message to show.
    pub fn finish_submission(
        &mut self,
        result: Result<ParticipantId, PersistenceError>,
    ) -> Option<ParticipantId> {
        self.loading = false;
        match result {
            Ok(id) => {
                self.last_error = None;
                self.participant = Some(id.clone());
                Some(id)
            }
            Err(err) => {
                let message = err.to_string();
                self.last_error = Some(if message.trim().is_empty() {
                    GENERIC_SUBMIT_ERROR.to_string()
                } else {
                    message
                });
                None
            }
        }
    }

    /// Flattens every answer into a `question_id=<json>` goal, in document
    /// order, and lifts the opt-in decision and email out of the first gate.
    pub fn build_submission(&self) -> NewParticipant {
        let goals = self
            .document
            .questions
            .iter()
            .filter_map(|q| {
                self.answers
                    .get(&q.id)
                    .map(|a| format!("{}={}", q.id, a.to_json()))
            })
            .collect();

        let gate = self
            .document
            .questions
            .iter()
            .find(|q| matches!(q.kind, QuestionKind::GateOptIn { .. }))
            .and_then(|q| match self.answers.get(&q.id) {
                Some(Answer::Gate(g)) => Some((q, g)),
                _ => None,
            });

        let (marketing_opt_in, email) = match gate {
            Some((question, g)) if g.join.as_deref() == Some(GATE_YES) => {
                (true, gate_email(question, g))
            }
            _ => (false, None),
        };

        NewParticipant {
            email,
            goals,
            marketing_opt_in,
        }
    }
}

fn gate_email(question: &Question, gate: &GateAnswer) -> Option<String> {
    let QuestionKind::GateOptIn { follow_ups_if_yes, .. } = &question.kind else {
        return None;
    };
    let field = follow_ups_if_yes
        .iter()
        .find(|fu| fu.kind == FollowUpKind::Email)
        .map(|fu| fu.id.as_str())
        .unwrap_or("email");
    let value = gate.field(field).trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn apply_input(
    question: &Question,
    previous: Option<&Answer>,
    input: AnswerInput,
) -> Result<Answer, SurveyError> {
    let wrong = || SurveyError::WrongInput {
        question: question.id.clone(),
        kind: question.kind.tag(),
    };
    let check_option = |option: &str| {
        if question.has_option(option) {
            Ok(())
        } else {
            Err(SurveyError::UnknownOption {
                question: question.id.clone(),
                option: option.to_string(),
            })
        }
    };

    match (&question.kind, input) {
        (
            QuestionKind::SingleSelect { .. } | QuestionKind::ImageSelect { .. },
            AnswerInput::Select { option_id },
        ) => {
            check_option(&option_id)?;
            Ok(Answer::Choice(option_id))
        }
        (
            QuestionKind::MultiSelect {
                max_select,
                exclusive_option_id,
                ..
            },
            AnswerInput::Select { option_id },
        ) => {
            check_option(&option_id)?;
            let mut selection = previous_selection(previous);
            toggle_selection(
                &mut selection,
                &option_id,
                *max_select,
                exclusive_option_id.as_deref(),
            );
            Ok(Answer::Selection(selection))
        }
        (QuestionKind::RankTopN { n, .. }, AnswerInput::Select { option_id }) => {
            check_option(&option_id)?;
            let mut selection = previous_selection(previous);
            toggle_selection(&mut selection, &option_id, Some(*n), None);
            Ok(Answer::Selection(selection))
        }
        (QuestionKind::ShortTextOneWord { max_chars, .. }, AnswerInput::Text { value }) => {
            check_length(&question.id, &value, *max_chars)?;
            Ok(Answer::Text(value))
        }
        (QuestionKind::GateOptIn { .. }, AnswerInput::Join { option_id }) => {
            check_option(&option_id)?;
            let mut gate = previous_gate(previous);
            gate.join = Some(option_id);
            Ok(Answer::Gate(gate))
        }
        (
            QuestionKind::GateOptIn {
                follow_ups_if_yes, ..
            },
            AnswerInput::FollowUp { field_id, value },
        ) => {
            let mut gate = previous_gate(previous);
            if gate.join.as_deref() != Some(GATE_YES) {
                return Err(SurveyError::GateClosed(question.id.clone()));
            }
            let field = follow_ups_if_yes
                .iter()
                .find(|fu| fu.id == field_id)
                .ok_or_else(|| SurveyError::UnknownField {
                    question: question.id.clone(),
                    field: field_id.clone(),
                })?;
            check_length(&format!("{}.{}", question.id, field.id), &value, field.max_chars)?;
            gate.fields.insert(field_id, value);
            Ok(Answer::Gate(gate))
        }
        _ => Err(wrong()),
    }
}

fn previous_selection(previous: Option<&Answer>) -> Vec<String> {
    match previous {
        Some(Answer::Selection(sel)) => sel.clone(),
        _ => Vec::new(),
    }
}

fn previous_gate(previous: Option<&Answer>) -> GateAnswer {
    match previous {
        Some(Answer::Gate(gate)) => gate.clone(),
        _ => GateAnswer::default(),
    }
}

fn check_length(target: &str, value: &str, max: Option<usize>) -> Result<(), SurveyError> {
    match max {
        Some(max) if value.chars().count() > max => Err(SurveyError::TooLong {
            target: target.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}
