//! Systems Manager adapter for running commands on the pooler host.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_ssm::Client;
use aws_sdk_ssm::error::{DisplayErrorContext, SdkError};
use aws_sdk_ssm::operation::get_command_invocation::GetCommandInvocationError;
use aws_sdk_ssm::types::InstanceInformationStringFilter;

use crate::domain::ports::{
    CommandInvocation, CommandStatus, PingStatus, PoolerHostControl, PoolerHostControlError,
};

const RUN_SHELL_SCRIPT: &str = "AWS-RunShellScript";
/// Systems Manager rejects delivery timeouts below thirty seconds.
const MIN_DELIVERY_TIMEOUT_SECS: u64 = 30;

/// Remote-command client for the PgBouncer instance.
#[derive(Clone, Debug)]
pub struct SsmPoolerHostControl {
    client: Client,
}

impl SsmPoolerHostControl {
    /// Build an adapter from shared SDK configuration.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::from_client(Client::new(sdk_config))
    }

    /// Wrap a pre-built client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn transport<E: std::error::Error>(error: &E) -> PoolerHostControlError {
    PoolerHostControlError::transport(DisplayErrorContext(error).to_string())
}

fn map_invocation_error(
    error: SdkError<GetCommandInvocationError>,
    command_id: &str,
) -> PoolerHostControlError {
    if error
        .as_service_error()
        .is_some_and(GetCommandInvocationError::is_invocation_does_not_exist)
    {
        PoolerHostControlError::invocation_does_not_exist(command_id)
    } else {
        transport(&error)
    }
}

fn timeout_seconds(timeout: Duration) -> i32 {
    i32::try_from(timeout.as_secs().max(MIN_DELIVERY_TIMEOUT_SECS)).unwrap_or(i32::MAX)
}

#[async_trait]
impl PoolerHostControl for SsmPoolerHostControl {
    async fn ping_status(
        &self,
        instance_id: &str,
    ) -> Result<Option<PingStatus>, PoolerHostControlError> {
        let filter = InstanceInformationStringFilter::builder()
            .key("InstanceIds")
            .values(instance_id)
            .build()
            .map_err(|err| PoolerHostControlError::rejected(err.to_string()))?;

        let output = self
            .client
            .describe_instance_information()
            .filters(filter)
            .send()
            .await
            .map_err(|err| transport(&err))?;

        Ok(output
            .instance_information_list()
            .first()
            .and_then(|info| info.ping_status())
            .map(|status| PingStatus::parse(status.as_str())))
    }

    async fn send_command(
        &self,
        instance_id: &str,
        script: &str,
        timeout: Duration,
    ) -> Result<String, PoolerHostControlError> {
        let seconds = timeout_seconds(timeout);
        let output = self
            .client
            .send_command()
            .instance_ids(instance_id)
            .document_name(RUN_SHELL_SCRIPT)
            .parameters("commands", vec![script.to_owned()])
            .parameters("executionTimeout", vec![seconds.to_string()])
            .timeout_seconds(seconds)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|service_error| {
                    service_error.is_invalid_instance_id() || service_error.is_invalid_document()
                }) {
                    PoolerHostControlError::rejected(DisplayErrorContext(&err).to_string())
                } else {
                    transport(&err)
                }
            })?;

        output
            .command()
            .and_then(|command| command.command_id())
            .map(str::to_owned)
            .ok_or_else(|| PoolerHostControlError::rejected("send command returned no command id"))
    }

    async fn command_invocation(
        &self,
        instance_id: &str,
        command_id: &str,
    ) -> Result<CommandInvocation, PoolerHostControlError> {
        let output = self
            .client
            .get_command_invocation()
            .command_id(command_id)
            .instance_id(instance_id)
            .send()
            .await
            .map_err(|err| map_invocation_error(err, command_id))?;

        Ok(CommandInvocation {
            status: output
                .status()
                .map_or(CommandStatus::Pending, |status| CommandStatus::parse(status.as_str())),
            stdout: output.standard_output_content().unwrap_or_default().to_owned(),
            stderr: output.standard_error_content().unwrap_or_default().to_owned(),
        })
    }
}
