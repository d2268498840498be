use super::types::{LatexInsightRequest, LeafInsightRequest};

/// Keys requested from the leaf/trunk prompt.
pub const LEAF_INSIGHT_KEYS: [&str; 5] = [
    "diagnosis",
    "treatment",
    "prevention",
    "severity_reasoning",
    "tappability_advice",
];

/// Keys requested from the latex prompt.
pub const LATEX_INSIGHT_KEYS: [&str; 6] = [
    "quality_assessment",
    "processing_advice",
    "contamination_handling",
    "market_value_insight",
    "preservation_tips",
    "market_analysis",
];

pub fn leaf_prompt(req: &LeafInsightRequest) -> String {
    format!(
        r#"You are a plant pathologist who specialises in rubber trees (Hevea brasiliensis).
A scan produced this result:
- Detected condition: {name}
- Model confidence: {confidence:.1}%
- Visual traits: {color} color, {spots} spots detected.

Answer with a single JSON object containing exactly these keys:
1. "diagnosis": a scientific explanation of the condition.
2. "treatment": specific chemical (fungicide names) and organic treatments.
3. "prevention": concrete steps that stop spread or recurrence.
4. "severity_reasoning": why the severity is low, medium or high given the spot count and disease type.
5. "tappability_advice": whether the tree can be tapped, and why.

Return raw JSON only, with no Markdown."#,
        name = req.disease_name,
        confidence = req.confidence,
        color = req.color_name,
        spots = req.spot_count,
    )
}

pub fn latex_prompt(req: &LatexInsightRequest) -> String {
    format!(
        r#"You are a rubber technologist who specialises in natural rubber latex quality control.
A latex scan produced this result:
- Detected type: {latex_type}
- Model confidence: {confidence:.1}%
- Contamination level: {level}
- Estimated Dry Rubber Content (DRC): {drc}%

Answer with a single JSON object containing exactly these keys:
1. "quality_assessment": a technical assessment of quality from the type and visual indicators.
2. "processing_advice": steps to process this latex for maximum yield and quality.
3. "contamination_handling": how to treat or filter the latex if it is contaminated.
4. "market_value_insight": a short comment on the likely market grade (Centrifuged Latex, USS, RSS).
5. "preservation_tips": chemicals (Ammonia, TMTD) that prevent coagulation before processing.
6. "market_analysis": {{
    "trend": "stable" | "increasing" | "decreasing",
    "estimated_price_range_php": "min-max" (e.g. "50-60"),
    "reasoning": "why this price range fits the quality and current market"
}}

Return raw JSON only, with no Markdown."#,
        latex_type = req.latex_type,
        confidence = req.confidence,
        level = req.contamination_level,
        drc = req.drc,
    )
}
