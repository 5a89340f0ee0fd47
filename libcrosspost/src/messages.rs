//! User-facing error text
//!
//! Two tables per provider: one message per [`ErrorKind`], and a lookup from
//! known technical messages to friendlier wording. Technical messages that are
//! not in the lookup resolve to the provider's default text so raw provider
//! strings never reach the user.

use crate::error::ErrorKind;
use crate::provider::Provider;

type Lookup = &'static [(&'static str, &'static str)];

const LINKEDIN_FRIENDLY: Lookup = &[
    ("Failed to fetch", "We can't reach LinkedIn right now. Check your internet connection!"),
    ("Network request failed", "Looks like you're offline. Check your internet connection!"),
    ("Request timed out", "LinkedIn is taking too long to answer. Please try again!"),
    ("Post content too long", "Your post is too long for LinkedIn. Try making it shorter!"),
    ("Invalid image format", "LinkedIn doesn't like this type of image. Try using a JPG or PNG!"),
    ("Image too large", "This image is too big for LinkedIn. Try using a smaller one (under 8MB)!"),
    ("Too many images", "LinkedIn only allows up to 5 images per post. Try removing some!"),
    ("Rate limit exceeded", "Whoa there! You're posting too quickly. Take a short break and try again!"),
    ("Invalid access token", "Your LinkedIn login has expired. Please sign in again!"),
    ("User not authorized", "LinkedIn needs you to sign in again to post!"),
];
const LINKEDIN_DEFAULT: &str = "Oops! Something went wrong. Please try again!";

const WORDPRESS_FRIENDLY: Lookup = &[
    ("Invalid access token", "Your login session has expired. Please log in again."),
    ("Rate limit exceeded", "Too many requests. Please try again later."),
    ("Network request failed", "Connection failed. Please check your internet connection and try again."),
    ("Failed to fetch", "Could not connect to WordPress. Please check your internet connection."),
    ("Request timed out", "WordPress did not respond in time. Please try again later."),
    ("Image too large", "The image is too large. Maximum size is 10MB."),
    ("Invalid image format", "Unsupported image format. Please use JPEG, PNG, GIF, or WebP."),
    ("Too many images", "You can only upload up to 20 images per post."),
];
const WORDPRESS_DEFAULT: &str =
    "An error occurred while communicating with WordPress. Please try again later.";

const FACEBOOK_FRIENDLY: Lookup = &[
    ("Invalid access token", "Your Facebook session has expired. Please reconnect your account."),
    ("Rate limit exceeded", "Facebook is limiting how often you can post. Please wait a few minutes."),
    ("Failed to fetch", "We can't reach Facebook right now. Check your internet connection."),
    ("Network request failed", "Connection to Facebook failed. Check your internet connection and try again."),
    ("Request timed out", "Facebook took too long to respond. Please try again."),
    ("Image too large", "This image is too large for Facebook. Please use one under 4MB."),
    ("Invalid image format", "Facebook can't use this image type. Try a JPG or PNG."),
    ("Too many images", "Facebook Page posts can include a single image."),
];
const FACEBOOK_DEFAULT: &str = "Something went wrong while posting to Facebook. Please try again.";

fn lookup_table(provider: Provider) -> Lookup {
    match provider {
        Provider::Facebook => FACEBOOK_FRIENDLY,
        Provider::LinkedIn => LINKEDIN_FRIENDLY,
        Provider::WordPress => WORDPRESS_FRIENDLY,
    }
}

/// Fallback text for anything the lookup does not recognize
pub fn default_message(provider: Provider) -> &'static str {
    match provider {
        Provider::Facebook => FACEBOOK_DEFAULT,
        Provider::LinkedIn => LINKEDIN_DEFAULT,
        Provider::WordPress => WORDPRESS_DEFAULT,
    }
}

/// Translate a technical message into user-facing text
pub fn friendly_message(provider: Provider, technical: &str) -> &'static str {
    lookup_table(provider)
        .iter()
        .find(|(key, _)| *key == technical)
        .map(|(_, message)| *message)
        .unwrap_or_else(|| default_message(provider))
}

/// User-facing text for an error kind
pub fn kind_message(provider: Provider, kind: ErrorKind) -> &'static str {
    match provider {
        Provider::LinkedIn => match kind {
            ErrorKind::AuthRequired => "You need to sign in to post on LinkedIn",
            ErrorKind::ValidationError => "Please check your post content",
            ErrorKind::MediaUploadError => "We couldn't upload your image to LinkedIn",
            ErrorKind::ImageSizeError => "Your image is too large (maximum 8MB)",
            ErrorKind::ImageFormatError => "This image format isn't supported by LinkedIn",
            ErrorKind::ApiError => "LinkedIn couldn't process your post",
            ErrorKind::RateLimitError => "You're posting too quickly. Please wait a moment",
            ErrorKind::NetworkError => "Check your internet connection and try again",
        },
        Provider::WordPress => match kind {
            ErrorKind::AuthRequired => "Your login session has expired. Please log in again.",
            ErrorKind::ValidationError => "Please add some content or an image before publishing.",
            ErrorKind::MediaUploadError => "The image could not be uploaded to WordPress. Please try again.",
            ErrorKind::ImageSizeError => "The image is too large. Maximum size is 10MB.",
            ErrorKind::ImageFormatError => "Unsupported image format. Please use JPEG, PNG, GIF, or WebP.",
            ErrorKind::ApiError => WORDPRESS_DEFAULT,
            ErrorKind::RateLimitError => "Too many requests. Please try again later.",
            ErrorKind::NetworkError => "Connection failed. Please check your internet connection and try again.",
        },
        Provider::Facebook => match kind {
            ErrorKind::AuthRequired => "You need to reconnect your Facebook account to post",
            ErrorKind::ValidationError => "Please check your post and the selected Page",
            ErrorKind::MediaUploadError => "We couldn't upload your image to Facebook",
            ErrorKind::ImageSizeError => "Your image is too large for Facebook (maximum 4MB)",
            ErrorKind::ImageFormatError => "This image format isn't supported by Facebook",
            ErrorKind::ApiError => "Facebook couldn't process your post",
            ErrorKind::RateLimitError => "Facebook is limiting how often you can post. Please wait a few minutes",
            ErrorKind::NetworkError => "Check your internet connection and try again",
        },
    }
}
