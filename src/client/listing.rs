use base64::Engine;
use std::sync::LazyLock;
use tracing::{debug, warn};

use super::SchoolsClient;
use crate::db::School;

const PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" fill="none" viewBox="0 0 24 24" stroke="#9ca3af"><path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M19 21V5a2 2 0 00-2-2H7a2 2 0 00-2 2v16m14 0h2m-2 0h-5m-9 0H3m2 0h5M9 7h1m-1 4h1m4-4h1m-1 4h1m-5 10v-5a1 1 0 011-1h2a1 1 0 011 1v5m-4 0h4"/></svg>"##;

/// Inline building graphic shown when a card has no usable image.
pub static PLACEHOLDER_IMAGE: LazyLock<String> = LazyLock::new(|| {
    format!(
        "data:image/svg+xml;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(PLACEHOLDER_SVG)
    )
});

pub const FETCH_FAILED_MESSAGE: &str = "Something went wrong while fetching schools";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardImage {
    Remote(String),
    Placeholder,
}

impl CardImage {
    pub fn src(&self) -> &str {
        match self {
            Self::Remote(url) => url,
            Self::Placeholder => PLACEHOLDER_IMAGE.as_str(),
        }
    }
}

/// One rendered school. The image source can change; the row never does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolCard {
    school: School,
    image: CardImage,
}

impl SchoolCard {
    pub fn new(school: School) -> Self {
        let image = match school.image.as_deref() {
            Some(url) if !url.is_empty() => CardImage::Remote(url.to_string()),
            _ => CardImage::Placeholder,
        };
        Self { school, image }
    }

    pub fn school(&self) -> &School {
        &self.school
    }

    pub fn image(&self) -> &CardImage {
        &self.image
    }

    /// The browser could not load the image: show the placeholder instead.
    pub fn on_image_error(&mut self) {
        if let CardImage::Remote(url) = &self.image {
            debug!(id = self.school.id, url = %url, "image failed to load, using placeholder");
        }
        self.image = CardImage::Placeholder;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingState {
    Loading,
    Ready(Vec<SchoolCard>),
    Error(String),
}

#[derive(Debug)]
pub struct ListingView {
    state: ListingState,
}

impl ListingView {
    /// Mount the view: exactly one list request.
    pub async fn mount(client: &SchoolsClient) -> Self {
        let mut view = Self {
            state: ListingState::Loading,
        };
        view.load(client).await;
        view
    }

    pub fn state(&self) -> &ListingState {
        &self.state
    }

    pub fn cards(&self) -> &[SchoolCard] {
        match &self.state {
            ListingState::Ready(cards) => cards,
            _ => &[],
        }
    }

    pub fn cards_mut(&mut self) -> &mut [SchoolCard] {
        match &mut self.state {
            ListingState::Ready(cards) => cards,
            _ => &mut [],
        }
    }

    /// Manual retry from the error state.
    pub async fn retry(&mut self, client: &SchoolsClient) {
        self.state = ListingState::Loading;
        self.load(client).await;
    }

    async fn load(&mut self, client: &SchoolsClient) {
        self.state = match client.list().await {
            Ok(list) => ListingState::Ready(list.schools.into_iter().map(SchoolCard::new).collect()),
            Err(e) => {
                warn!(error = %e, "failed to fetch schools");
                let message = match e {
                    crate::DirectoryError::Api { message, .. } => message,
                    _ => FETCH_FAILED_MESSAGE.to_string(),
                };
                ListingState::Error(message)
            }
        };
    }
}
