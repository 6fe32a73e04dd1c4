//! The interview script: ordered questions, the fixed recommendation, and
//! the instructions handed to the assistant in each phase.
//!
//! A `Script` is plain data. The turn controller reads it but never decides
//! anything from its contents, so a deployment can ship a different script
//! (see [`Script::from_json_file`]) without touching the branching logic.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CAREER_QUESTIONS: &[&str] = &[
    "To start, where do you like to work? (Like an office, outside, at home, a lab, a workshop, or traveling)",
    "Do you enjoy working alone, with other people, or both?",
    "Which things do you like to do? (For example, solve problems, help people, build things, design, teach, organize)",
    "Do you have any skills or experience? (Like certificates, licenses, or languages that you speak)",
    "How do you feel about hard work? (Do you like it, is it okay, or do you prefer sitting at a desk?)",
    "Are there any job you don’t want? (Like sales, food service, military, or healthcare)",
    "Do you like jobs that stay the same or change a lot?",
    "What things are important to you in a job? (Like helping the earth, working with others, using tech, or being creative)",
];

const CAREER_RECOMMENDATION: &str = "
Based on your input, here are three roles you might explore:
<ol>
    <li><b>Project Manager:</b> Ideal for those who enjoy organizing, leading teams, and overseeing tasks to successful completion.</li>
    <li><b><b>Content Creator:</b></b> Suited for individuals with a flair for writing, visual storytelling, or digital media production.</li>
    <li><b><b>Data Analyst:</b></b> Best for analytical thinkers who enjoy interpreting data, finding patterns, and making data-driven decisions.</li>
</ol>
These are general suggestions to get you started. For more detailed information on specific roles or to explore other options, please consult a career counselor or reliable online resources.
";

const CAREER_TRANSITION: &str =
    "Thank you for answering my questions! Based on your responses, here are some career recommendations for you:";

const CAREER_APOLOGY: &str =
    "Sorry, I'm having trouble responding right now. Please try again later.";

const CAREER_POST_INSTRUCTION: &str = "
You are a friendly, helpful, and general-purpose AI assistant. Your previous task of providing career recommendations is now complete. You can now answer a wide range of questions and engage in general conversation.

**Here are your core rules for this phase:**
1.  **General Assistance:** Respond intelligently and helpfully to a wide variety of user questions.
2.  **No More Career Recommendations:** Your specific career recommendation task is finished. Do not offer or generate new career recommendations. If asked for recommendations again, politely state that your specific task is complete, but you can help with other general inquiries.
3.  **Concise and Clear:** Keep your responses to the point and easy to understand.
4.  **Do NOT summarize your role or ask open-ended \"What's on your mind?\" questions.** Simply respond to the user's query directly.
5.  **Use History:** Always consider the full conversation history when responding.
";

fn career_pre_instruction(recommendation: &str) -> String {
    format!(
        "
You are a friendly, helpful, and concise career recommendation AI designed for a research study. Your primary goal is to interact with the user by asking a series of predefined questions first, and then *automatically provide a specific, pre-determined set of recommendations after the user has answered all your questions*.

**Here are your core rules for this phase:**
1.  **Ask Questions First (and then automatically recommend):** After the user's initial trigger phrase, you will ask questions from your question list in order. **Once the user has answered your last question, you will automatically provide the fixed career recommendations.**
2.  **Deliver Fixed Recommendations (if explicitly asked early):** If the user's message clearly indicates they are asking for career recommendations (e.g., \"What careers should I consider?\", \"Suggest job paths for me\", \"Give me some career ideas\", \"What are good jobs?\", \"Recommend jobs for me\") *before you have asked all your questions*, you MUST ONLY and EXACTLY respond with the following text:
    {recommendation}
    Do NOT generate new recommendations, elaborate on these, or provide any additional information about them beyond what is in the provided fixed text. If the user asks for more details about a specific recommendation *that you just provided*, politely state that you can only provide the initial set for this interaction and suggest they consult other resources for in-depth information.
3.  **General Responses (Before Recommendations):** If the user asks a general question *before* you have provided the fixed recommendations and *before* all your questions are asked, you may answer normally as a helpful AI, but keep your responses concise and always attempt to steer the conversation back to your next career-related question.
4.  **No New Recommendations:** Under no circumstances should you generate new career recommendations beyond the fixed set.
5.  **Use History:** Always consider the full conversation history when responding.
6.  **Concise and Clear:** Keep your responses to the point and easy to understand.
"
    )
}

/// Ordered questions plus the fixed texts of one interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Questions asked in order, addressed by 0-based index.
    pub questions: Vec<String>,
    /// The fixed recommendation payload. Emitted byte-for-byte.
    pub recommendation: String,
    /// Sentence placed before the recommendation when it is auto-delivered.
    pub transition: String,
    /// Assistant instruction while the recommendation is still pending.
    pub pre_recommendation_instruction: String,
    /// Assistant instruction once the recommendation has been delivered.
    pub post_recommendation_instruction: String,
    /// Static reply used when the assistant call fails.
    pub apology: String,
}

impl Script {
    /// The built-in career-guidance interview.
    pub fn career() -> Self {
        Self {
            questions: CAREER_QUESTIONS.iter().map(|q| q.to_string()).collect(),
            recommendation: CAREER_RECOMMENDATION.to_string(),
            transition: CAREER_TRANSITION.to_string(),
            pre_recommendation_instruction: career_pre_instruction(CAREER_RECOMMENDATION),
            post_recommendation_instruction: CAREER_POST_INSTRUCTION.to_string(),
            apology: CAREER_APOLOGY.to_string(),
        }
    }

    /// Load a script from a JSON file and validate it.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let script: Script = serde_json::from_str(&raw).map_err(|e| {
            ConfigError::ParseError(format!("script {}: {e}", path.display()))
        })?;
        script.validate()?;
        Ok(script)
    }

    /// Reject scripts the controller cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.questions.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "questions".to_string(),
                message: "script must contain at least one question".to_string(),
            });
        }
        if let Some(idx) = self.questions.iter().position(|q| q.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "questions".to_string(),
                message: format!("question {idx} is empty"),
            });
        }
        if self.recommendation.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "recommendation".to_string(),
                message: "recommendation text must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Number of scripted questions (N).
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Question at `index`, if any.
    pub fn question(&self, index: usize) -> Option<&str> {
        self.questions.get(index).map(String::as_str)
    }

    /// Text for the automatic delivery after the last answer.
    pub fn auto_recommendation(&self) -> String {
        format!("{}\n\n{}", self.transition, self.recommendation)
    }

    /// Assistant instruction for the current phase.
    pub fn instruction(&self, recommendation_given: bool) -> &str {
        if recommendation_given {
            &self.post_recommendation_instruction
        } else {
            &self.pre_recommendation_instruction
        }
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::career()
    }
}
