//! Bindings for the `Basic` key/value contract.

use alloy::sol;

sol! {
    interface Basic {
        /// Contract version string.
        function Version() external view returns (string memory);

        /// Stored value for `key`, zero when unset.
        function Items(string memory key) external view returns (uint256);

        /// Stores `value` under `key` and emits `ItemSet`.
        function SetItem(string memory key, uint256 value) external;

        event ItemSet(string key, uint256 value);
    }
}
