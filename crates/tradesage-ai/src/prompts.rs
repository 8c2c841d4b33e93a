use tradesage_models::{Grade, SignalAction};

/// System prompt for free-form market analysis.
pub fn analysis_system_prompt() -> &'static str {
    "You are a professional trading analyst assisting users of a market dashboard. \
     Give concise, data-driven analysis. State the key levels, the trend, and the main \
     risks. Never invent prices or figures that are not in the question; say when data \
     is missing."
}

/// Example object shown to the model in the signal prompt.
fn signal_schema() -> String {
    let example = serde_json::json!({
        "grade": "B+",
        "confidence": 72,
        "action": "BUY",
        "target": 195.5,
        "stop": 181.25,
        "reasoning": "<two or three sentences citing the data>"
    });
    format!("{example:#}")
}

/// User prompt asking for a single trading signal for `stock_data`.
pub fn trading_signal_prompt(stock_data: &serde_json::Value) -> String {
    let grades: Vec<&str> = Grade::ALL.iter().map(Grade::as_str).collect();
    let actions: Vec<&str> = SignalAction::ALL.iter().map(SignalAction::as_str).collect();

    format!(
        "Analyze the following stock data and produce one trading signal.\n\n\
         ## STOCK DATA\n\n\
         {stock_data:#}\n\n\
         ## OUTPUT\n\n\
         Respond with ONLY a JSON object, no markdown and no other text, with exactly these fields:\n\
         - \"grade\": one of {grades}\n\
         - \"confidence\": integer from 0 to 100\n\
         - \"action\": one of {actions}\n\
         - \"target\": price target, a positive number\n\
         - \"stop\": stop-loss price, a positive number\n\
         - \"reasoning\": short explanation grounded in the data above\n\n\
         Example:\n{schema}",
        grades = grades.join(", "),
        actions = actions.join(", "),
        schema = signal_schema(),
    )
}
