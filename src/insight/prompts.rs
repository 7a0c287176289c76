use crate::{
    chart::serializer::StructuredText,
    insight::{
        error::InsightError,
        types::{AnalysisKind, ChartSubjects, ConversationTurn, InsightRequest},
    },
};

fn shared_guidance() -> &'static str {
    concat!(
        "You are an experienced astrologer writing for a curious, non-expert reader.\n",
        "The chart data arrives as XML-like structured text. Treat it as the only source of truth: ",
        "never invent placements, degrees, houses or aspects that the data does not support.\n",
        "If an <error> element appears, say which data is unavailable and work around it.\n",
        "Write warm, grounded prose in plain paragraphs with short section headings. ",
        "Avoid fatalistic statements and medical, legal or financial directives.\n"
    )
}

/// System prompt for `kind`. Total over the enum; adding a kind forces a template here.
pub fn system_prompt(kind: AnalysisKind) -> String {
    let task = match kind {
        AnalysisKind::BirthChartAnalysis => concat!(
            "Task: interpret the natal chart as a whole.\n",
            "Cover the Sun, Moon and Ascendant first, then each planet by sign and house, ",
            "noting retrograde planets and the Rahu/Ketu axis. ",
            "Close with the chart's recurring themes."
        ),
        AnalysisKind::PredictionsTransits => concat!(
            "Task: describe the current transits against the natal chart.\n",
            "Compare each transiting planet in <transit_details> with the natal positions ",
            "and houses in <birth_chart_details>. Emphasise slow planets and any transit over ",
            "the Ascendant or Midheaven. Frame predictions as tendencies, not certainties."
        ),
        AnalysisKind::CompatibilityAnalysis => concat!(
            "Task: compare two natal charts for relationship compatibility (synastry).\n",
            "The first <birth_chart_details> belongs to the requester, the second to their ",
            "partner. Discuss Sun, Moon, Venus and Mars contacts, house overlays, shared ",
            "strengths and likely friction, and give balanced, practical advice."
        ),
        AnalysisKind::RemedialMeasures => concat!(
            "Task: suggest supportive remedial practices for the chart's challenging placements.\n",
            "Identify afflicted or retrograde planets and difficult houses, then suggest ",
            "traditional remedies such as mantras, charity, fasting days, colours or gemstones. ",
            "Present them as optional practices, never as guarantees."
        ),
    };
    format!("{}\n{}", shared_guidance(), task)
}

/// First user turn: serialized chart(s), plus transits for predictions.
pub fn initial_user_turn(request: &InsightRequest) -> Result<String, InsightError> {
    let mut sections = Vec::new();
    match (&request.charts, request.kind.requires_partner_chart()) {
        (ChartSubjects::Single(chart), false) => {
            sections.push(chart.to_structured_text());
        }
        (ChartSubjects::Pair { primary, partner }, true) => {
            sections.push(primary.to_structured_text());
            sections.push(partner.to_structured_text());
        }
        (ChartSubjects::Single(_), true) => {
            return Err(InsightError::InvalidRequest(format!(
                "{} needs two charts",
                request.kind
            )));
        }
        (ChartSubjects::Pair { .. }, false) => {
            return Err(InsightError::InvalidRequest(format!(
                "{} takes exactly one chart",
                request.kind
            )));
        }
    }

    if request.kind == AnalysisKind::PredictionsTransits {
        let transit = request.transit.as_ref().ok_or_else(|| {
            InsightError::InvalidRequest(format!("{} needs a transit snapshot", request.kind))
        })?;
        sections.push(transit.to_structured_text());
    }

    sections.push(format!(
        "Please provide the {} for the data above.",
        request.kind.as_str().to_ascii_lowercase().replace('_', " ")
    ));
    Ok(sections.join("\n"))
}

/// `(system prompt, turns)` ready for the engine.
pub fn build_conversation(
    request: &InsightRequest,
) -> Result<(String, Vec<ConversationTurn>), InsightError> {
    let mut turns = Vec::with_capacity(request.history.len() + 2);
    turns.push(ConversationTurn::user(initial_user_turn(request)?));
    turns.extend(request.history.iter().cloned());
    if let Some(question) = request
        .question
        .as_deref()
        .map(str::trim)
        .filter(|question| !question.is_empty())
    {
        turns.push(ConversationTurn::user(question));
    }
    Ok((system_prompt(request.kind), turns))
}
