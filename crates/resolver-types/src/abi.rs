//! Solidity bindings for the contracts the resolver talks to.
//!
//! These definitions match the on-chain ABIs so that revert data, fulfillment
//! calls and batch calls encode and decode byte-for-byte.

use alloy_sol_types::sol;

sol! {
	/// Oracle contract interface for offchain data lookups.
	interface IERC7412 {
		/// Raised when the contract needs offchain data to proceed.
		error OracleDataRequired(address oracleContract, bytes oracleQuery, uint256 feeRequired);
		/// Raised when a fulfillment was submitted without the required fee.
		error FeeRequired(uint256 feeAmount);
		/// Raised when several batched sub-calls reverted.
		error Errors(bytes[] errors);

		/// Identifier of the data source this contract understands.
		function oracleId() external view returns (bytes32);
		/// Submits resolved offchain data.
		function fulfillOracleQuery(bytes signedOffchainData) external payable;
	}
}

sol! {
	/// Two-argument form of `OracleDataRequired` emitted by older oracle contracts.
	interface IERC7412Legacy {
		error OracleDataRequired(address oracleContract, bytes oracleQuery);
	}
}

sol! {
	/// Multicall forwarder that appends the original sender to each sub-call.
	interface ITrustedMulticallForwarder {
		struct Call3Value {
			address target;
			bool requireSuccess;
			uint256 value;
			bytes callData;
		}

		struct CallResult {
			bool success;
			bytes returnData;
		}

		function aggregate3Value(Call3Value[] calldata calls) external payable returns (CallResult[] memory returnData);
	}
}

sol! {
	/// ERC-2771 trusted forwarder declaration.
	interface IERC2771Context {
		function isTrustedForwarder(address forwarder) external view returns (bool);
	}
}

sol! {
	/// Smart account batch execution entry point.
	interface ISmartAccount {
		function executeBatch(address[] calldata dest, uint256[] calldata value, bytes[] calldata func) external;
	}
}
