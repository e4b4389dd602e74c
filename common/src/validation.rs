use std::sync::OnceLock;

use regex::Regex;

use crate::models::{LoginRequest, NewReview, RegisterForm};

pub const MIN_PASSWORD_LEN: usize = 6;

fn phone_regex() -> &'static Regex {
     static PHONE: OnceLock<Regex> = OnceLock::new();
     PHONE.get_or_init(|| Regex::new(r"^\+?1?\d{9,15}$").expect("phone pattern is valid"))
}

fn email_regex() -> &'static Regex {
     static EMAIL: OnceLock<Regex> = OnceLock::new();
     EMAIL.get_or_init(|| {
          Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
     })
}

pub fn validate_email(email: &str) -> Result<(), String> {
     if !email_regex().is_match(email) {
          return Err("Invalid email format".to_string());
     }
     Ok(())
}

pub fn validate_password(password: &str, confirm: &str) -> Result<(), String> {
     if password.chars().count() < MIN_PASSWORD_LEN {
          return Err(format!("Password must be at least {} characters", MIN_PASSWORD_LEN));
     }
     if password != confirm {
          return Err("Password confirmation does not match".to_string());
     }
     Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), String> {
     if !phone_regex().is_match(phone) {
          return Err("Phone number must be 9-15 digits, optionally starting with +".to_string());
     }
     Ok(())
}

pub fn validate_register_form(form: &RegisterForm) -> Result<(), String> {
     if form.email.is_empty() || form.username.is_empty() || form.password.is_empty() || form.confirm.is_empty() {
          return Err("Email, username and password are required".to_string());
     }
     validate_email(&form.email)?;
     validate_password(&form.password, &form.confirm)?;
     if let Some(phone) = form.phone_number.as_deref() {
          if !phone.is_empty() {
               validate_phone(phone)?;
          }
     }
     Ok(())
}

pub fn validate_login_request(req: &LoginRequest) -> Result<(), String> {
     if req.username.trim().is_empty() || req.password.is_empty() {
          return Err("Username and password are required".to_string());
     }
     Ok(())
}

pub fn validate_review(review: &NewReview) -> Result<(), String> {
     if !(1..=5).contains(&review.rating) {
          return Err("Rating must be between 1 and 5".to_string());
     }
     if review.comment.trim().is_empty() {
          return Err("Comment must not be empty".to_string());
     }
     Ok(())
}

#[cfg(test)]
mod tests {
     use super::*;

     fn form() -> RegisterForm {
          RegisterForm {
               email: "an@example.com".to_string(),
               username: "an".to_string(),
               password: "secret1".to_string(),
               confirm: "secret1".to_string(),
               ..Default::default()
          }
     }

     #[test]
     fn accepts_complete_form() {
          assert!(validate_register_form(&form()).is_ok());
     }

     #[test]
     fn rejects_short_or_mismatched_password() {
          let mut short = form();
          short.password = "abc".to_string();
          short.confirm = "abc".to_string();
          assert!(validate_register_form(&short).unwrap_err().contains("at least 6"));

          let mut mismatch = form();
          mismatch.confirm = "secret2".to_string();
          assert!(validate_register_form(&mismatch).unwrap_err().contains("confirmation"));
     }

     #[test]
     fn phone_is_optional_but_checked() {
          let mut with_phone = form();
          with_phone.phone_number = Some("+84901234567".to_string());
          assert!(validate_register_form(&with_phone).is_ok());

          with_phone.phone_number = Some("09-01".to_string());
          assert!(validate_register_form(&with_phone).is_err());

          with_phone.phone_number = Some(String::new());
          assert!(validate_register_form(&with_phone).is_ok());
     }

     #[test]
     fn missing_fields_are_reported_first() {
          let mut empty = form();
          empty.email.clear();
          assert_eq!(
               validate_register_form(&empty).unwrap_err(),
               "Email, username and password are required"
          );
     }

     #[test]
     fn review_rating_bounds() {
          let mut review = NewReview { game: 1, rating: 5, comment: "great".to_string() };
          assert!(validate_review(&review).is_ok());
          review.rating = 0;
          assert!(validate_review(&review).is_err());
          review.rating = 6;
          assert!(validate_review(&review).is_err());
          review.rating = 3;
          review.comment = "  ".to_string();
          assert!(validate_review(&review).is_err());
     }

     #[test]
     fn login_requires_both_fields() {
          let req = LoginRequest { username: "an".to_string(), password: String::new() };
          assert!(validate_login_request(&req).is_err());
     }
}
