// Critique LLM prompt templates.
// All prompts for the analysis module are defined here.

pub const CRITIQUE_PROMPT_TEMPLATE: &str = "Please analyze this portfolio image/document and provide/enumerate detailed, industry-ready recommendations and feedback. Consider visual hierarchy, information architecture, storytelling, and design best practices. Format your response by encapsulating each sentence with <p> and </p> tags. Separate different ideas with <br> tags in between. Separate headings with <br>. Add line breaks before bullet points if you are going to use it. Utilize <strong> and <i> to emphasize keywords. No need to introduce your response. \n\n{extracted_text}";
