//! Cleaning, prompting, and response post-processing for the LLM-backed
//! extraction path (component H of the crawl pipeline).

mod clean;
mod gateway;
mod planner;

pub use clean::{clean_html, clean_html_default};
pub use gateway::HttpChatModel;
pub use planner::{ChatMessage, ChatModel, HttpPlanner, Planner, PlannerOutput, EXTRACTION_SYSTEM_PROMPT};
