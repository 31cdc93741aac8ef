use serde::{Deserialize, Serialize};

/// Tags appended to every composed prompt.
pub const COMMON_SDXL_TERMS: &str = "ultra-detailed, 8k, photorealistic, cinematic composition";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterDetails {
    pub description: String,
    pub outfit: Option<String>,
    pub expression: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentDetails {
    pub setting: String,
    pub mood: Option<String>,
    pub time_of_day: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraSetup {
    pub shot_type: String,
    pub angle: Option<String>,
    pub lens: Option<String>,
    pub composition_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightingDetails {
    pub description: String,
    pub temperature: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtisticStyle {
    pub genre: String,
    pub influences: Option<String>,
    pub additional_details: Option<String>,
}

/// Structured cinematic prompt assembled facet by facet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CinematicPrompt {
    pub character: CharacterDetails,
    pub environment: EnvironmentDetails,
    pub camera: CameraSetup,
    pub lighting: LightingDetails,
    pub style: ArtisticStyle,
    pub subject_focus: String,
    pub ambiance_atmosphere: String,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl CinematicPrompt {
    /// Render the structure as one prompt string, facets in fixed order,
    /// followed by [`COMMON_SDXL_TERMS`].
    pub fn render(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        let mut character = vec![self.character.description.trim().to_string()];
        if let Some(outfit) = non_empty(&self.character.outfit) {
            character.push(format!("wearing {}", outfit));
        }
        if let Some(expression) = non_empty(&self.character.expression) {
            character.push(format!("with a {} expression", expression));
        }
        parts.push(character.join(", "));

        let mut environment = vec![format!("in a {}", self.environment.setting.trim())];
        if let Some(mood) = non_empty(&self.environment.mood) {
            environment.push(format!("creating a {} mood", mood));
        }
        if let Some(time) = non_empty(&self.environment.time_of_day) {
            environment.push(format!("during {}", time));
        }
        parts.push(environment.join(" "));

        parts.push(format!("Focusing on {}.", self.subject_focus.trim()));
        parts.push(format!(
            "The overall atmosphere is {}.",
            self.ambiance_atmosphere.trim()
        ));

        let mut camera = vec![self.camera.shot_type.trim().to_string()];
        if let Some(angle) = non_empty(&self.camera.angle) {
            camera.push(angle.to_string());
        }
        if let Some(lens) = non_empty(&self.camera.lens) {
            camera.push(format!("using a {} lens", lens));
        }
        if let Some(notes) = non_empty(&self.camera.composition_notes) {
            camera.push(format!("with {}", notes));
        }
        parts.push(format!("Camera: {}.", camera.join(", ")));

        let mut lighting = vec![self.lighting.description.trim().to_string()];
        if let Some(temperature) = non_empty(&self.lighting.temperature) {
            lighting.push(format!("with {} tones", temperature));
        }
        parts.push(format!("Lighting: {}.", lighting.join(", ")));

        let mut style = vec![format!("Style: {}", self.style.genre.trim())];
        if let Some(influences) = non_empty(&self.style.influences) {
            style.push(format!("influenced by {}", influences));
        }
        if let Some(details) = non_empty(&self.style.additional_details) {
            style.push(details.to_string());
        }
        parts.push(format!("{}.", style.join(". ")));

        parts.push(COMMON_SDXL_TERMS.to_string());

        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> CinematicPrompt {
        CinematicPrompt {
            character: CharacterDetails {
                description: "A young witch".to_string(),
                ..Default::default()
            },
            environment: EnvironmentDetails {
                setting: "enchanted forest".to_string(),
                ..Default::default()
            },
            camera: CameraSetup {
                shot_type: "full shot".to_string(),
                ..Default::default()
            },
            lighting: LightingDetails {
                description: "moonlight".to_string(),
                ..Default::default()
            },
            style: ArtisticStyle {
                genre: "fantasy art".to_string(),
                ..Default::default()
            },
            subject_focus: "the witch casting a spell".to_string(),
            ambiance_atmosphere: "mystical and magical".to_string(),
        }
    }

    #[test]
    fn test_render_minimal() {
        let rendered = minimal().render();
        assert_eq!(
            rendered,
            "A young witch in a enchanted forest Focusing on the witch casting a spell. \
             The overall atmosphere is mystical and magical. Camera: full shot. \
             Lighting: moonlight. Style: fantasy art. \
             ultra-detailed, 8k, photorealistic, cinematic composition"
        );
    }

    #[test]
    fn test_render_with_optional_facets() {
        let mut prompt = minimal();
        prompt.character.outfit = Some("star-patterned robes".to_string());
        prompt.character.expression = Some("determined".to_string());
        prompt.camera.lens = Some("35mm".to_string());
        prompt.lighting.temperature = Some("cool".to_string());
        prompt.style.influences = Some("Studio Ghibli".to_string());

        let rendered = prompt.render();
        assert!(rendered.starts_with(
            "A young witch, wearing star-patterned robes, with a determined expression"
        ));
        assert!(rendered.contains("Camera: full shot, using a 35mm lens."));
        assert!(rendered.contains("Lighting: moonlight, with cool tones."));
        assert!(rendered.contains("Style: fantasy art. influenced by Studio Ghibli."));
    }

    #[test]
    fn test_blank_optional_facets_are_skipped() {
        let mut prompt = minimal();
        prompt.character.outfit = Some("   ".to_string());
        assert!(!prompt.render().contains("wearing"));
    }
}
