//! Prompt templates for the estimate pipeline's generative calls.
//!
//! All prompts ask for strict JSON with camelCase keys so responses
//! deserialize straight into the pipeline's domain types. Parsing stays
//! lenient anyway (see `parse`); these templates just push the odds.

use serde_json::Value;

/// Vision prompt used when a file type has no dedicated decoder (images and
/// unknown formats).
pub const VISION_EXTRACTION_PROMPT: &str = "\
You are reading a construction blueprint image. Extract every piece of \
textual and numeric information you can see, including: overall dimensions \
and measurements, material specifications, annotations and callouts, drawing \
scale, room names and numbers, structural details (framing, foundations, \
load-bearing elements), and MEP details (mechanical, electrical, plumbing). \
Transcribe text exactly as written. Respond with the extracted content as \
plain text.";

/// Build the analyzer prompt: full extracted text plus project context plus
/// the fixed analysis checklist.
pub fn analysis_prompt(extracted_text: &str, project_context: &Value) -> String {
    format!(
        "You are a senior construction estimator reviewing blueprint content.\n\
         \n\
         Project context:\n{context}\n\
         \n\
         Blueprint content:\n{text}\n\
         \n\
         Analyze the blueprint and respond with a single JSON object with \
         these keys:\n\
         - \"blueprintTypes\": array of type tags (architectural, structural, \
         mep, civil, ...)\n\
         - \"scope\": overall construction scope\n\
         - \"structuralElements\": structural elements present\n\
         - \"mepSystems\": mechanical/electrical/plumbing systems present\n\
         - \"finishes\": interior and exterior finishes\n\
         - \"siteWork\": site work required\n\
         - \"estimatedValue\": rough total project value in dollars, as a \
         number\n\
         \n\
         Respond with JSON only.",
        context = project_context,
        text = extracted_text,
    )
}

/// Build the line item generation prompt, grounded on the serialized
/// analysis.
pub fn line_items_prompt(analysis: &str, project_context: &Value) -> String {
    format!(
        "You are a construction estimator producing a cost estimate.\n\
         \n\
         Project context:\n{context}\n\
         \n\
         Blueprint analysis:\n{analysis}\n\
         \n\
         Generate a detailed list of estimate line items covering site \
         preparation, foundation and structural work, finishes, MEP systems, \
         specialties, and project overhead/contingency. Respond with a JSON \
         array; each element must have: \"name\", \"description\", \
         \"quantity\" (number), \"unit\", \"category\", \"unitPrice\" \
         (number), \"aiConfidence\" (0 to 1), \"notes\".\n\
         \n\
         Respond with the JSON array only.",
        context = project_context,
        analysis = analysis,
    )
}

/// Build the demolition gap prompt used by the coverage enhancer.
pub fn demolition_prompt(analysis: &str) -> String {
    format!(
        "Based on this blueprint analysis:\n{analysis}\n\
         \n\
         Generate demolition line items for this project, covering: existing \
         structure removal, hazardous material abatement, site clearing, \
         utility disconnections, and debris/waste disposal. Respond with a \
         JSON array; each element must have: \"name\", \"description\", \
         \"quantity\" (number), \"unit\", \"unitPrice\" (number), \
         \"aiConfidence\" (0 to 1).\n\
         \n\
         Respond with the JSON array only.",
        analysis = analysis,
    )
}
