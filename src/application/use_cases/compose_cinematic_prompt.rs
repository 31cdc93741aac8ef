use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::application::ChatBackend;
use crate::domain::{
    ArtisticStyle, CameraSetup, CharacterDetails, CinematicPrompt, DomainError,
    EnvironmentDetails, LightingDetails, PromptNormalizer, RequestBuilder,
};

/// Number of chat calls one composition makes.
pub const COMPOSE_STEPS: u64 = 15;

/// Builds a [`CinematicPrompt`] by asking the model one facet at a time.
///
/// Later questions quote earlier answers (outfit and expression use the
/// character description, lens uses shot type and genre, and so on), so the
/// calls run strictly in sequence. The first failed call aborts composition.
pub struct CinematicComposer {
    chat_backend: Arc<dyn ChatBackend>,
    builder: RequestBuilder,
    normalizer: PromptNormalizer,
    show_progress: bool,
}

impl CinematicComposer {
    pub fn new(
        chat_backend: Arc<dyn ChatBackend>,
        builder: RequestBuilder,
        normalizer: PromptNormalizer,
    ) -> Self {
        Self {
            chat_backend,
            builder,
            normalizer,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub async fn compose(&self, character_name: &str) -> Result<CinematicPrompt, DomainError> {
        let name = character_name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid_input("character name cannot be empty"));
        }

        info!("Composing cinematic prompt for: {}", name);

        let progress = if self.show_progress {
            let bar = ProgressBar::new(COMPOSE_STEPS);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                    .expect("Invalid progress bar template")
                    .progress_chars("#>-"),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let step = Step {
            composer: self,
            name,
            progress: &progress,
        };

        let visuals = step
            .ask(
                "character",
                "You are an AI assistant helping describe character visuals for an image generation prompt. Focus on appearance, age, and key features.",
                format!("Describe the character '{}'.", name),
            )
            .await?;
        let outfit = step
            .ask(
                "outfit",
                "You are an AI assistant helping describe outfit details for a character based on their visuals for an image generation prompt.",
                format!("Given the character '{}' who looks like: '{}', describe their outfit.", name, visuals),
            )
            .await?;
        let expression = step
            .ask(
                "expression",
                "You are an AI assistant helping describe the facial expression or emotion of a character for an image generation prompt.",
                format!("What is the expression of '{}' who looks like: '{}'?", name, visuals),
            )
            .await?;

        let setting = step
            .ask(
                "setting",
                "You are an AI assistant creating a compelling environment/setting for a character in an image generation prompt.",
                format!("Describe a suitable setting for the character '{}'.", name),
            )
            .await?;
        let mood = step
            .ask(
                "mood",
                "You are an AI assistant defining the mood of an environment based on its description.",
                format!("For the setting '{}', what is the emotional atmosphere or tone?", setting),
            )
            .await?;
        let time_of_day = step
            .ask(
                "time of day",
                "You are an AI assistant determining an appropriate time of day for a described environment.",
                format!("For the setting '{}', what is the time of day?", setting),
            )
            .await?;

        let genre = step
            .ask(
                "genre",
                "You are an AI assistant determining an artistic genre (e.g., photorealistic, fantasy art) for a character.",
                format!("What artistic genre best fits '{}'?", name),
            )
            .await?;
        let influences = step
            .ask(
                "influences",
                "You are an AI assistant suggesting artistic influences (artists, movies) for a given genre.",
                format!("For the genre '{}', suggest some artistic influences.", genre),
            )
            .await?;

        let shot_type = step
            .ask(
                "shot type",
                "You are an AI assistant selecting a cinematic camera shot type (e.g., close-up, medium shot, full shot) for a character in a scene.",
                format!("For '{}' in '{}', what is a good camera shot type?", name, setting),
            )
            .await?;
        let angle = step
            .ask(
                "camera angle",
                "You are an AI assistant selecting a camera angle (e.g., eye-level, low angle) for a character.",
                format!("For '{}' with a '{}', suggest a camera angle.", name, shot_type),
            )
            .await?;
        let lens = step
            .ask(
                "lens",
                "You are an AI assistant suggesting a camera lens (e.g., 35mm, wide-angle) appropriate for a shot type and artistic style.",
                format!("For a '{}' in a '{}' style, what lens would be suitable?", shot_type, genre),
            )
            .await?;

        let lighting = step
            .ask(
                "lighting",
                "You are an AI assistant describing the lighting of a scene.",
                format!("Describe the lighting for '{}' in '{}' during '{}'.", name, setting, time_of_day),
            )
            .await?;
        let temperature = step
            .ask(
                "light temperature",
                "You are an AI assistant describing the lighting temperature.",
                format!(
                    "For lighting described as '{}', what is its color temperature (e.g. cool, warm)?",
                    lighting
                ),
            )
            .await?;

        let subject_focus = step
            .ask(
                "subject focus",
                "You are an AI assistant defining the main subject or focus of an image, given a character and setting.",
                format!(
                    "The character is '{}' in '{}'. What should be the main subject focus of the image?",
                    visuals, setting
                ),
            )
            .await?;
        let ambiance = step
            .ask(
                "ambiance",
                "You are an AI assistant describing the overall ambiance and atmosphere to convey in an image.",
                format!(
                    "Given the character '{}', the setting '{}', and mood '{}', describe the overall ambiance and atmosphere.",
                    visuals, setting, mood
                ),
            )
            .await?;

        progress.finish_with_message("composed");

        Ok(CinematicPrompt {
            character: CharacterDetails {
                description: visuals,
                outfit: Some(outfit),
                expression: Some(expression),
            },
            environment: EnvironmentDetails {
                setting,
                mood: Some(mood),
                time_of_day: Some(time_of_day),
            },
            camera: CameraSetup {
                shot_type,
                angle: Some(angle),
                lens: Some(lens),
                composition_notes: None,
            },
            lighting: LightingDetails {
                description: lighting,
                temperature: Some(temperature),
            },
            style: ArtisticStyle {
                genre,
                influences: Some(influences),
                additional_details: None,
            },
            subject_focus,
            ambiance_atmosphere: ambiance,
        })
    }
}

struct Step<'a> {
    composer: &'a CinematicComposer,
    name: &'a str,
    progress: &'a ProgressBar,
}

impl Step<'_> {
    async fn ask(&self, facet: &str, system: &str, user: String) -> Result<String, DomainError> {
        self.progress.set_message(facet.to_string());

        let request = self.composer.builder.custom(self.name, system, &user)?;
        let completion = self.composer.chat_backend.complete(&request).await;
        let raw = completion.into_result().inspect_err(|_| {
            self.progress.abandon_with_message(format!("{} failed", facet));
        })?;

        let answer = self.composer.normalizer.clean_text(&raw);
        if answer.is_empty() {
            self.progress.abandon_with_message(format!("{} failed", facet));
            return Err(DomainError::malformed(format!(
                "empty answer for {}",
                facet
            )));
        }

        debug!("Composer {}: {}", facet, answer);
        self.progress.inc(1);
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::MockChatBackend;
    use crate::domain::BackendFailure;

    fn composer(backend: Arc<MockChatBackend>) -> CinematicComposer {
        CinematicComposer::new(backend, RequestBuilder::default(), PromptNormalizer::new())
    }

    #[tokio::test]
    async fn test_compose_fills_every_facet() {
        let backend = Arc::new(MockChatBackend::new());
        let prompt = composer(backend.clone()).compose("Gandalf the Grey").await.unwrap();

        assert_eq!(backend.calls(), COMPOSE_STEPS as usize);
        assert!(prompt.character.description.contains("Gandalf the Grey"));
        assert!(prompt.character.outfit.is_some());
        assert!(prompt.lighting.temperature.is_some());
        assert!(!prompt.ambiance_atmosphere.is_empty());
        assert!(prompt
            .render()
            .ends_with("ultra-detailed, 8k, photorealistic, cinematic composition"));
    }

    #[tokio::test]
    async fn test_compose_cleans_boilerplate() {
        let backend = Arc::new(MockChatBackend::replying(
            "Sure! A weathered wizard with a long grey beard.\n\nLet me know if you need more.",
        ));
        let prompt = composer(backend).compose("Gandalf").await.unwrap();

        assert_eq!(
            prompt.character.description,
            "A weathered wizard with a long grey beard"
        );
    }

    #[tokio::test]
    async fn test_compose_aborts_on_first_failure() {
        let backend = Arc::new(MockChatBackend::failing(BackendFailure::Timeout, "timeout"));
        let err = composer(backend.clone()).compose("Gandalf").await.unwrap_err();

        assert!(matches!(err, DomainError::BackendUnreachable(ref d) if d == "timeout"));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_compose_rejects_empty_name() {
        let backend = Arc::new(MockChatBackend::new());
        let err = composer(backend.clone()).compose("  ").await.unwrap_err();

        assert!(err.is_invalid_input());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_compose_rejects_empty_answers() {
        let backend = Arc::new(MockChatBackend::replying("Sure!"));
        let err = composer(backend).compose("Gandalf").await.unwrap_err();

        assert!(matches!(err, DomainError::MalformedResponse(_)));
    }
}
