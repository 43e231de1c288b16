//! System prompt construction and marker handling.

use mamaguide_knowledge::Section;

pub const KNOWLEDGE_BASE_MARKER: &str = "[Using pregnancy knowledge base]";
pub const GENERAL_KNOWLEDGE_MARKER: &str = "[Using general knowledge]";

const INSTRUCTIONS: &str = "You are a helpful pregnancy care assistant with access to a comprehensive medical knowledge base about pregnancy, labor, medications, symptoms, and more.

CRITICAL INSTRUCTIONS:
1. If the knowledge base context contains relevant information for the user's question, YOU MUST use it as your primary source and start your response with \"[Using pregnancy knowledge base]\"
2. If the knowledge base doesn't contain relevant information, start your response with \"[Using general knowledge]\"
3. Always prioritize the knowledge base information over general knowledge when available
4. Provide specific, actionable advice based on the context provided
5. Always recommend consulting healthcare providers for medical decisions
6. Be conversational and supportive while remaining medically accurate
";

const NO_CONTEXT_NOTE: &str =
    "No specific information found in the pregnancy knowledge base for this query.";

/// Numbered context block, or `None` when nothing was retrieved.
pub fn knowledge_context(sections: &[Section]) -> Option<String> {
    if sections.is_empty() {
        return None;
    }
    let entries: Vec<String> = sections
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s.content))
        .collect();
    Some(format!("RELEVANT PREGNANCY INFORMATION:\n{}", entries.join("\n\n")))
}

pub fn system_prompt(sections: &[Section]) -> String {
    match knowledge_context(sections) {
        Some(context) => format!("{INSTRUCTIONS}\nKNOWLEDGE BASE CONTEXT:\n{context}"),
        None => format!("{INSTRUCTIONS}\n{NO_CONTEXT_NOTE}"),
    }
}

/// Remove both source markers wherever they appear.
pub fn strip_markers(text: &str) -> String {
    text.replace(KNOWLEDGE_BASE_MARKER, "")
        .replace(GENERAL_KNOWLEDGE_MARKER, "")
        .trim()
        .to_string()
}
