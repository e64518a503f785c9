//! HTTP client for the regional statistics service

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::SourceConfig;
use crate::domain::{DistrictDetail, EnhancedDetail, RegionSummary, YearRecord};
use crate::infrastructure::traits::{RegionSource, SourceError, SourceResult};
use crate::infrastructure::wire::{
    parse_year, DistrictDetailDto, DistrictListDto, ProvinceListDto, SeriesDto,
    SubdistrictListDto, YearRecordDto, YearsDto,
};

/// [`RegionSource`] backed by the statistics REST API.
pub struct HttpRegionSource {
    base_url: String,
    client: Client,
}

impl HttpRegionSource {
    pub fn new(config: &SourceConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `url` and decode the body; `Ok(None)` on 404.
    async fn get_optional<T: DeserializeOwned>(&self, url: &str) -> SourceResult<Option<T>> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            warn!("GET {} failed with {}", url, status);
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| SourceError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> SourceResult<T> {
        self.get_optional(url).await?.ok_or_else(|| SourceError::Status {
            status: StatusCode::NOT_FOUND.as_u16(),
            url: url.to_string(),
        })
    }

    fn decode_err(url: &str, message: String) -> SourceError {
        SourceError::Decode {
            url: url.to_string(),
            message,
        }
    }
}

#[async_trait]
impl RegionSource for HttpRegionSource {
    #[instrument(level = "debug", skip(self))]
    async fn list_provinces(&self) -> SourceResult<Vec<RegionSummary>> {
        let dto: ProvinceListDto = self.get(&self.url("/api/national/sido")).await?;
        Ok(dto.sido_list.into_iter().map(Into::into).collect())
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_districts(&self, province_code: &str) -> SourceResult<Vec<RegionSummary>> {
        let url = self.url(&format!(
            "/api/national/sido/{}",
            urlencoding::encode(province_code)
        ));
        let dto: DistrictListDto = self.get(&url).await?;
        Ok(dto.sigungu_list.into_iter().map(Into::into).collect())
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_subdistricts(&self, district_code: &str) -> SourceResult<Vec<RegionSummary>> {
        let url = self.url(&format!(
            "/api/national/sigungu/{}",
            urlencoding::encode(district_code)
        ));
        let dto: SubdistrictListDto = self.get(&url).await?;
        Ok(dto.emdong_list.into_iter().map(Into::into).collect())
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_year_record(&self, subdistrict_code: &str, year: i32) -> SourceResult<YearRecord> {
        let url = self.url(&format!(
            "/api/national/emdong/{}?year={}",
            urlencoding::encode(subdistrict_code),
            year
        ));
        let dto: YearRecordDto = self.get(&url).await?;
        Ok(dto.into())
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_enhanced_detail(&self, subdistrict_code: &str) -> SourceResult<EnhancedDetail> {
        let url = self.url(&format!(
            "/api/emdong/{}/enhanced",
            urlencoding::encode(subdistrict_code)
        ));
        match self.get_optional::<SeriesDto>(&url).await? {
            Some(dto) => dto.into_enhanced().map_err(|m| Self::decode_err(&url, m)),
            None => {
                debug!("no enhanced data for {}", subdistrict_code);
                Ok(EnhancedDetail::default())
            }
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_years(&self) -> SourceResult<Vec<i32>> {
        let url = self.url("/api/years");
        let dto: YearsDto = self.get(&url).await?;
        let mut years = dto
            .years
            .iter()
            .map(|y| parse_year(y))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|m| Self::decode_err(&url, m))?;
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_timeseries(
        &self,
        subdistrict_code: &str,
    ) -> SourceResult<BTreeMap<i32, YearRecord>> {
        let url = self.url(&format!(
            "/api/emdong/{}/timeseries",
            urlencoding::encode(subdistrict_code)
        ));
        match self.get_optional::<SeriesDto>(&url).await? {
            Some(dto) => dto.into_records().map_err(|m| Self::decode_err(&url, m)),
            None => {
                debug!("no timeseries for {}", subdistrict_code);
                Ok(BTreeMap::new())
            }
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_district_detail(&self, district_code: &str) -> SourceResult<DistrictDetail> {
        let url = self.url(&format!(
            "/api/national/sigungu/{}/detail",
            urlencoding::encode(district_code)
        ));
        let dto: DistrictDetailDto = self.get(&url).await?;
        Ok(dto.into_domain(district_code))
    }
}
