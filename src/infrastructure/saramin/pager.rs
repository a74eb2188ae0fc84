//! 페이지 단위 순회
//!
//! 핸들러가 한 페이지 처리를 끝내야 다음 페이지를 요청한다.
//! 종료 조건: 핸들러 `Break`, 빈 페이지, `start >= total`, total 을 모를 때 짧은 페이지.

use std::ops::ControlFlow;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::client::{JobSearchParams, SaraminClient};
use super::types::JobSearchResponse;
use crate::infrastructure::errors::SaraminError;

pub const DEFAULT_PAGE_SIZE: i64 = 110;

/// Per-page callback. `ControlFlow::Break` stops paging without an error.
#[async_trait]
pub trait PageHandler: Send {
    type Error: From<SaraminError> + Send;

    async fn handle_page(&mut self, page: &JobSearchResponse) -> Result<ControlFlow<()>, Self::Error>;
}

impl SaraminClient {
    /// Walk every page matching `params`, returning the number of pages fetched
    pub async fn job_search_pages<H: PageHandler>(
        &self,
        params: &JobSearchParams,
        handler: &mut H,
        cancel: &CancellationToken,
    ) -> Result<usize, H::Error> {
        let mut params = params.clone();
        if params.count <= 0 {
            params.count = DEFAULT_PAGE_SIZE;
        }
        let page_size = params.count;
        let mut start = params.start.max(0);
        let mut pages = 0;

        loop {
            params.start = start;
            let response = self.job_search(&params, cancel).await?;
            pages += 1;

            if handler.handle_page(&response).await?.is_break() {
                debug!(pages, "handler stopped paging");
                return Ok(pages);
            }

            let page_len = response.jobs.job.len() as i64;
            if page_len == 0 {
                return Ok(pages);
            }

            start += page_size;
            match response.jobs.total.as_i64() {
                Some(total) => {
                    if start >= total {
                        return Ok(pages);
                    }
                }
                None => {
                    if page_len < page_size {
                        return Ok(pages);
                    }
                }
            }
        }
    }
}
