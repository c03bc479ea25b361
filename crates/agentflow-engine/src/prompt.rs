//! Assembles the system prompt handed to a model adapter (spec.md §4.4
//! step 10): a fixed section order, each section preceded by a labelled
//! header so observers can tell where a given instruction came from.

const TOOL_USE_PREAMBLE: &str = "\
You have access to tools. When a tool can accomplish part of the task, invoke it — \
never describe what a tool call would do in place of making one.";

/// The optional inputs beyond the fixed preamble and the agent's own
/// prompt fragment. `None`/empty sections are omitted entirely rather than
/// emitted with empty bodies.
#[derive(Debug, Clone, Default)]
pub struct PromptSections {
    pub project_context: Option<String>,
    pub skill_summaries: Vec<String>,
    pub agent_prompt: String,
    pub extra_instructions: Option<String>,
}

/// Builds the system prompt in the fixed order: tool-use preamble, project
/// context, skill summaries, agent prompt fragment, extra instructions.
pub fn assemble_system_prompt(sections: &PromptSections) -> String {
    let mut rendered = Vec::new();

    rendered.push(format!("## Tools\n\n{TOOL_USE_PREAMBLE}"));

    if let Some(context) = &sections.project_context {
        if !context.trim().is_empty() {
            rendered.push(format!("## Project context\n\n{context}"));
        }
    }

    if !sections.skill_summaries.is_empty() {
        let body = sections
            .skill_summaries
            .iter()
            .map(|summary| format!("- {summary}"))
            .collect::<Vec<_>>()
            .join("\n");
        rendered.push(format!("## Skills\n\n{body}"));
    }

    if !sections.agent_prompt.trim().is_empty() {
        rendered.push(format!("## Agent\n\n{}", sections.agent_prompt));
    }

    if let Some(extra) = &sections.extra_instructions {
        if !extra.trim().is_empty() {
            rendered.push(format!("## Additional instructions\n\n{extra}"));
        }
    }

    rendered.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_render_in_fixed_order() {
        let sections = PromptSections {
            project_context: Some("a rust workspace".to_string()),
            skill_summaries: vec!["testing".to_string(), "deploy".to_string()],
            agent_prompt: "You are a careful coding assistant.".to_string(),
            extra_instructions: Some("Prefer small diffs.".to_string()),
        };

        let prompt = assemble_system_prompt(&sections);
        let tools_at = prompt.find("## Tools").unwrap();
        let context_at = prompt.find("## Project context").unwrap();
        let skills_at = prompt.find("## Skills").unwrap();
        let agent_at = prompt.find("## Agent").unwrap();
        let extra_at = prompt.find("## Additional instructions").unwrap();

        assert!(tools_at < context_at);
        assert!(context_at < skills_at);
        assert!(skills_at < agent_at);
        assert!(agent_at < extra_at);
    }

    #[test]
    fn omits_empty_optional_sections() {
        let sections = PromptSections {
            agent_prompt: "Be helpful.".to_string(),
            ..Default::default()
        };

        let prompt = assemble_system_prompt(&sections);
        assert!(!prompt.contains("## Project context"));
        assert!(!prompt.contains("## Skills"));
        assert!(!prompt.contains("## Additional instructions"));
        assert!(prompt.contains("## Agent"));
    }
}
