//! Showcase upload form.

use base64::{engine::general_purpose::STANDARD, Engine};
use ik_core::{new_id, AppCategory, AppError, Result, ShowcaseApp};

#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ShowcaseUpload {
    pub name: String,
    pub description: String,
    pub image: Option<ImageFile>,
    pub app_url: Option<String>,
    pub category: AppCategory,
}

impl ShowcaseUpload {
    /// Validates the form and turns the image into a data URL.
    pub fn into_app(self) -> Result<ShowcaseApp> {
        let name = self.name.trim();
        let description = self.description.trim();
        if name.is_empty() || description.is_empty() {
            return Err(AppError::Validation("Name and description are required.".to_string()));
        }
        let image = self
            .image
            .filter(|i| !i.bytes.is_empty())
            .ok_or_else(|| AppError::Validation("Please choose an image for your app.".to_string()))?;

        let mime = mime_guess::from_path(&image.file_name)
            .first()
            .filter(|m| m.type_() == mime_guess::mime::IMAGE)
            .ok_or_else(|| {
                AppError::Validation(format!("`{}` is not an image file.", image.file_name))
            })?;

        let app_url = match self.app_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            Some(url) if !(url.starts_with("https://") || url.starts_with("http://")) => {
                return Err(AppError::Validation("The app link must start with http:// or https://.".to_string()))
            }
            other => other,
        };

        Ok(ShowcaseApp {
            id: new_id(),
            name: name.to_string(),
            description: description.to_string(),
            image_url: format!("data:{};base64,{}", mime.essence_str(), STANDARD.encode(&image.bytes)),
            app_url,
            category: self.category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(image: Option<ImageFile>) -> ShowcaseUpload {
        ShowcaseUpload {
            name: " Pocket Vet ".into(),
            description: "Pet symptom checker".into(),
            image,
            app_url: Some("https://pocket.vet".into()),
            category: AppCategory::Health,
        }
    }

    #[test]
    fn test_image_becomes_data_url() {
        let app = upload(Some(ImageFile {
            file_name: "shot.PNG".into(),
            bytes: vec![1, 2, 3],
        }))
        .into_app()
        .unwrap();
        assert_eq!(app.name, "Pocket Vet");
        assert_eq!(app.image_url, "data:image/png;base64,AQID");
    }

    #[test]
    fn test_missing_or_wrong_image_is_rejected() {
        assert!(matches!(upload(None).into_app(), Err(AppError::Validation(_))));
        let text = ImageFile {
            file_name: "notes.txt".into(),
            bytes: vec![1],
        };
        assert!(matches!(upload(Some(text)).into_app(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_bad_app_url_is_rejected() {
        let mut form = upload(Some(ImageFile {
            file_name: "a.jpg".into(),
            bytes: vec![1],
        }));
        form.app_url = Some("pocket.vet".into());
        assert!(matches!(form.into_app(), Err(AppError::Validation(_))));
    }
}
