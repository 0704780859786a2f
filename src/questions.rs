//! 수도 맞히기 문제 생성기

use crate::error::{GameError, Result};
use crate::protocol::Question;
use rand::{seq::index::sample, Rng};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// 문제 공급자
///
/// `next(n)`은 보기 `n`개(서로 다르며 정답 포함)를 가진 문제와 정답을 돌려줍니다.
pub trait QuestionProvider: Send + Sync {
    fn next(&self, options: usize) -> Result<(Question, String)>;
}

/// 국가/수도 데이터
#[derive(Debug, Clone, Deserialize)]
pub struct Country {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Capital")]
    pub capital: String,
}

/// 미리 로드한 국가 목록에서 무작위로 출제
pub struct CapitalsProvider {
    countries: Vec<Country>,
}

impl CapitalsProvider {
    /// 수도가 중복되는 항목은 첫 항목만 남김
    pub fn new(countries: Vec<Country>) -> Self {
        let mut seen = HashSet::new();
        let countries = countries
            .into_iter()
            .filter(|c| !c.name.is_empty() && !c.capital.is_empty())
            .filter(|c| seen.insert(c.capital.clone()))
            .collect();
        Self { countries }
    }

    /// JSON 파일에서 로드
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| GameError::Dataset(format!("{}: {}", path.display(), e)))?;
        let countries: Vec<Country> = serde_json::from_str(&data)
            .map_err(|e| GameError::Dataset(format!("{}: {}", path.display(), e)))?;

        let provider = Self::new(countries);
        tracing::info!(
            path = %path.display(),
            countries = provider.len(),
            "Capitals dataset loaded"
        );
        Ok(provider)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

impl QuestionProvider for CapitalsProvider {
    fn next(&self, options: usize) -> Result<(Question, String)> {
        if options == 0 || options > self.countries.len() {
            return Err(GameError::Dataset(format!(
                "cannot draw {} options from {} countries",
                options,
                self.countries.len()
            )));
        }

        let mut rng = rand::thread_rng();
        let picked: Vec<&Country> = sample(&mut rng, self.countries.len(), options)
            .into_iter()
            .map(|i| &self.countries[i])
            .collect();
        let answer = picked[rng.gen_range(0..picked.len())];

        let question = Question {
            id: Uuid::new_v4().to_string(),
            country: answer.name.clone(),
            options: picked.iter().map(|c| c.capital.clone()).collect(),
        };
        Ok((question, answer.capital.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn country(name: &str, capital: &str) -> Country {
        Country {
            name: name.into(),
            capital: capital.into(),
        }
    }

    fn sample_provider() -> CapitalsProvider {
        CapitalsProvider::new(vec![
            country("France", "Paris"),
            country("Peru", "Lima"),
            country("Norway", "Oslo"),
            country("Japan", "Tokyo"),
            country("Kenya", "Nairobi"),
        ])
    }

    #[test]
    fn options_are_distinct_and_contain_answer() {
        let provider = sample_provider();
        for _ in 0..50 {
            let (question, answer) = provider.next(4).unwrap();
            assert_eq!(question.options.len(), 4);
            let distinct: HashSet<_> = question.options.iter().collect();
            assert_eq!(distinct.len(), 4);
            assert!(question.options.contains(&answer));
        }
    }

    #[test]
    fn country_matches_answer() {
        let provider = sample_provider();
        let (question, answer) = provider.next(5).unwrap();
        let expected = provider
            .countries
            .iter()
            .find(|c| c.name == question.country)
            .map(|c| c.capital.clone());
        assert_eq!(expected, Some(answer));
    }

    #[test]
    fn question_ids_are_unique() {
        let provider = sample_provider();
        let (a, _) = provider.next(2).unwrap();
        let (b, _) = provider.next(2).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn too_many_options_is_an_error() {
        let provider = sample_provider();
        assert!(matches!(provider.next(6), Err(GameError::Dataset(_))));
    }

    #[test]
    fn duplicate_capitals_are_collapsed() {
        let provider = CapitalsProvider::new(vec![
            country("Israel", "Jerusalem"),
            country("Palestine", "Jerusalem"),
            country("Chile", "Santiago"),
        ]);
        assert_eq!(provider.len(), 2);
    }

    #[test]
    fn dataset_accepts_capitalized_keys() {
        let data = r#"[{"Name":"Peru","Capital":"Lima"},{"name":"Chile","capital":"Santiago"}]"#;
        let countries: Vec<Country> = serde_json::from_str(data).unwrap();
        assert_eq!(CapitalsProvider::new(countries).len(), 2);
    }
}
