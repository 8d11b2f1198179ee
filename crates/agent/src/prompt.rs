//! System instructions for a chat, built from the user's vehicle.

use askmycar_core::Vehicle;

const GUIDELINES: &str = "\
You have access to:
1. The owner's manual for this specific vehicle (use fetch_manual when relevant)
2. Web search for recalls, TSBs, common issues, and current info (use web_search when needed)

Guidelines:
- Be friendly, direct, and helpful like a knowledgeable mechanic friend
- Always give specific answers for THIS car, not generic advice
- When discussing warning lights, maintenance intervals, or specifications, use the manual
- Cite your sources naturally (\"According to your owner's manual...\" or \"Based on your 2019 Camry's specs...\")
- Keep answers concise but complete. Use bullet points for steps or lists.
- If you don't know something specific to this car, say so and suggest checking with a dealer
- Never recommend dangerous DIY repairs without appropriate safety warnings";

pub fn system_prompt(vehicle: &Vehicle) -> String {
    let mut prompt = String::from("You are AskMyCar, an expert automotive assistant for a specific vehicle.\n\n");
    prompt.push_str("The user's car:\n");
    prompt.push_str(&format!("- Year: {}\n", vehicle.year));
    prompt.push_str(&format!("- Make: {}\n", vehicle.make));
    prompt.push_str(&format!("- Model: {}\n", vehicle.model));
    if let Some(trim) = vehicle.trim_level() {
        prompt.push_str(&format!("- Trim: {trim}\n"));
    }
    if let Some(engine) = vehicle.engine_desc() {
        prompt.push_str(&format!("- Engine: {engine}\n"));
    }
    if let Some(vin) = vehicle.vin_number() {
        prompt.push_str(&format!("- VIN: {vin}\n"));
    }
    prompt.push('\n');
    prompt.push_str(GUIDELINES);
    prompt
}
