//! [`ObjectStore`] backed by `aws-sdk-s3`.

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{
    BehaviorVersion, Credentials, Region, RequestChecksumCalculation, ResponseChecksumValidation,
};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
};
use bytes::Bytes;
use tracing::{debug, info};

use super::{FetchedObject, ObjectStore, PartRecord, PutReceipt};
use crate::config::{DEFAULT_REGION, HarnessConfig};
use crate::error::{HarnessError, HarnessResult};

/// Storage capability talking to a real S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    region: String,
}

impl S3ObjectStore {
    /// Build a client from the harness configuration.
    ///
    /// Uses static credentials, the configured region and endpoint, and only
    /// sends or validates flexible checksums when an operation requires them,
    /// since many S3-compatible services do not implement them.
    #[must_use]
    pub fn new(config: &HarnessConfig) -> Self {
        let creds = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "s3verify",
        );

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(creds)
            .force_path_style(config.force_path_style)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired);

        let endpoint = config.endpoint_url();
        if !endpoint.is_empty() {
            builder = builder.endpoint_url(endpoint);
        }

        Self::from_client(aws_sdk_s3::Client::from_conf(builder.build()), &config.region)
    }

    /// Wrap an already configured client.
    #[must_use]
    pub fn from_client(client: aws_sdk_s3::Client, region: &str) -> Self {
        Self {
            client,
            region: region.to_owned(),
        }
    }

    /// The underlying SDK client.
    #[must_use]
    pub fn client(&self) -> &aws_sdk_s3::Client {
        &self.client
    }
}

/// Render an SDK failure as a transport error, keeping the HTTP status.
fn transport_error<E>(operation: &'static str, err: &SdkError<E, HttpResponse>) -> HarnessError
where
    E: std::error::Error + 'static,
{
    HarnessError::Transport {
        operation,
        status: err.raw_response().map(|r| r.status().as_u16()),
        message: DisplayErrorContext(err).to_string(),
    }
}

fn is_http_not_found<E>(err: &SdkError<E, HttpResponse>) -> bool {
    err.raw_response()
        .is_some_and(|r| r.status().as_u16() == 404)
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn create_bucket(&self, bucket: &str) -> HarnessResult<()> {
        let mut req = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            req = req.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match req.send().await {
            Ok(_) => {
                debug!(bucket, "create_bucket completed");
                Ok(())
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(CreateBucketError::is_bucket_already_owned_by_you) =>
            {
                info!(bucket, "bucket already exists and is owned by us");
                Ok(())
            }
            Err(err) => Err(transport_error("CreateBucket", &err)),
        }
    }

    async fn head_bucket(&self, bucket: &str) -> HarnessResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(HeadBucketError::is_not_found)
                    || is_http_not_found(&err) =>
            {
                Ok(false)
            }
            Err(err) => Err(transport_error("HeadBucket", &err)),
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_md5: &str,
    ) -> HarnessResult<PutReceipt> {
        let size = body.len();
        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("text/plain")
            .content_md5(content_md5)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| transport_error("PutObject", &e))?;

        debug!(bucket, key, size, "put_object completed");
        Ok(PutReceipt {
            key: key.to_owned(),
            etag: output.e_tag().map(ToOwned::to_owned),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> HarnessResult<FetchedObject> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| transport_error("GetObject", &e))?;

        let content_length = output.content_length().and_then(|n| u64::try_from(n).ok());
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| HarnessError::transport("GetObject", e.to_string()))?
            .into_bytes();

        debug!(bucket, key, size = body.len(), "get_object completed");
        Ok(FetchedObject {
            key: key.to_owned(),
            content_length,
            body,
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> HarnessResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| transport_error("DeleteObject", &e))?;
        debug!(bucket, key, "delete_object completed");
        Ok(())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> HarnessResult<bool> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(HeadObjectError::is_not_found)
                    || is_http_not_found(&err) =>
            {
                Ok(false)
            }
            Err(err) => Err(transport_error("HeadObject", &err)),
        }
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> HarnessResult<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type("text/plain")
            .send()
            .await
            .map_err(|e| transport_error("CreateMultipartUpload", &e))?;

        let upload_id = output.upload_id().map(ToOwned::to_owned).ok_or_else(|| {
            HarnessError::transport("CreateMultipartUpload", "response carried no upload id")
        })?;
        debug!(bucket, key, upload_id = %upload_id, "create_multipart_upload completed");
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> HarnessResult<Option<String>> {
        let size = body.len();
        let output = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| transport_error("UploadPart", &e))?;

        debug!(bucket, key, upload_id, part_number, size, "upload_part completed");
        Ok(output.e_tag().map(ToOwned::to_owned))
    }

    async fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> HarnessResult<Vec<PartRecord>> {
        let mut parts = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut req = self
                .client
                .list_parts()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id);
            if let Some(m) = marker.take() {
                req = req.part_number_marker(m);
            }
            let output = req
                .send()
                .await
                .map_err(|e| transport_error("ListParts", &e))?;

            parts.extend(output.parts().iter().map(|p| PartRecord {
                part_number: p.part_number().unwrap_or_default(),
                etag: p.e_tag().map(ToOwned::to_owned),
                size: p.size().and_then(|s| u64::try_from(s).ok()),
            }));

            match output.next_part_number_marker() {
                Some(next) if output.is_truncated() == Some(true) => {
                    marker = Some(next.to_owned());
                }
                _ => break,
            }
        }

        debug!(bucket, key, upload_id, count = parts.len(), "list_parts completed");
        Ok(parts)
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartRecord],
    ) -> HarnessResult<()> {
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(
                parts
                    .iter()
                    .map(|p| {
                        CompletedPart::builder()
                            .part_number(p.part_number)
                            .set_e_tag(p.etag.clone())
                            .build()
                    })
                    .collect(),
            ))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| transport_error("CompleteMultipartUpload", &e))?;

        debug!(bucket, key, upload_id, parts = parts.len(), "complete_multipart_upload completed");
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> HarnessResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| transport_error("AbortMultipartUpload", &e))?;
        debug!(bucket, key, upload_id, "abort_multipart_upload completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_build_client_from_config() {
        let config = HarnessConfig::builder()
            .bucket_name("conformance".into())
            .region("eu-west-1".into())
            .endpoint("localhost:9000".into())
            .disable_ssl(true)
            .access_key_id("test".into())
            .secret_access_key("test".into())
            .build();

        let store = S3ObjectStore::new(&config);
        assert_eq!(store.region, "eu-west-1");
        assert_eq!(
            store.client().config().region().map(ToString::to_string),
            Some("eu-west-1".to_owned())
        );
    }
}
