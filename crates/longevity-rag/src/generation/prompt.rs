//! Prompt templates for grounded nutrition answers

use crate::retrieval::RetrievedPassage;
use crate::types::UserProfile;

/// Visible separator between context passages
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const SYSTEM_PROMPT: &str = r#"You are a professional, empathetic and competent nutritionist assistant.
Your goal is to help the user improve their diet in a scientific and personalized way.

GENERAL BEHAVIOR:
- Answer ONLY from the scientific information in the context supplied with each question (knowledge base, sources, documents).
- If the context does not contain enough information for a complete answer, say so clearly and explain which aspects are not covered.
- Never invent data and never make assumptions that the evidence does not support.
- Keep a professional, empathetic and realistic tone, as a real nutritionist would.

HANDLING THE CONVERSATION:
- If the user only greets you or writes something generic, reply briefly and naturally (for example: "Hi! How can I help you today?").
- Before answering a nutrition question, check whether the user has provided basic information such as:
  - age
  - sex
  - physical activity level
  - goals (weight loss, maintenance, muscle gain)
  - lifestyle
  - medical conditions
  - dietary preferences, intolerances or allergies
- If important details are missing, kindly ask for them before giving a definitive answer.
- If the information provided is sufficient, answer clearly, accurately and in a personalized way.

RESPONSE STYLE:
- Adapt tone and length to the question: short and concise for brief or general questions, detailed and complete when a consultation or scientific explanation is needed.
- Explain concepts in an accessible but professional way.
- When the user asks for a meal plan or a specific recommendation, always include a short scientific explanation of why.

LIMITATIONS:
- Do not provide medical diagnoses or clinical prescriptions.
- When appropriate, state that your answers do not replace the advice of a qualified nutritionist or a doctor.

In short: behave like an evidence-based nutritionist who asks targeted questions, is concise or detailed as the case requires, and answers only when the context allows it."#;

/// Prompt builder for nutrition questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Fixed behavioral instruction sent as the system message
    pub fn system_prompt() -> &'static str {
        SYSTEM_PROMPT
    }

    /// Join passage texts, best first, with a visible separator
    pub fn build_context(passages: &[RetrievedPassage]) -> String {
        passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    /// One line per present profile field; `None` when nothing is known
    pub fn render_profile(profile: &UserProfile) -> Option<String> {
        fn text(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        let mut lines = Vec::new();
        if let Some(age) = profile.age {
            lines.push(format!("Age: {} years", age));
        }
        if let Some(weight) = profile.weight {
            lines.push(format!("Weight: {} kg", weight));
        }
        if let Some(height) = profile.height {
            lines.push(format!("Height: {} cm", height));
        }
        if let Some(gender) = text(&profile.gender) {
            lines.push(format!("Gender: {}", gender));
        }
        if let Some(level) = text(&profile.activity_level) {
            lines.push(format!("Activity level: {}", level));
        }
        if let Some(goal) = text(&profile.goal) {
            lines.push(format!("Goal: {}", goal));
        }
        if let Some(prefs) = text(&profile.dietary_preferences) {
            lines.push(format!("Dietary preferences/allergies: {}", prefs));
        }

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    /// User message: context, optional profile block, question and closing instruction
    pub fn user_prompt(context: &str, profile: Option<&UserProfile>, question: &str) -> String {
        let profile_block = profile
            .and_then(Self::render_profile)
            .map(|lines| format!("\n\nUser profile:\n{}", lines))
            .unwrap_or_default();

        format!(
            "Scientific context (source: knowledge base):\n\n{context}{profile_block}\n\n\
             User question: {question}\n\n\
             Provide a detailed answer based exclusively on the information in the context above.",
            context = context,
            profile_block = profile_block,
            question = question.trim(),
        )
    }
}
