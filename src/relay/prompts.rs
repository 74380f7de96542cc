// Indonesian guidance on climate impacts, disaster safety and public health.
const SYSTEM_INSTRUCTION: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/id/system.txt"
));

/// Fixed system prompt prepended to every upstream conversation.
pub fn system_instruction() -> &'static str {
    SYSTEM_INSTRUCTION.trim_end()
}
